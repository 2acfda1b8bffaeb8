//! Command-line interface handlers

pub mod commands;

pub use commands::{
    cmd_add_signer, cmd_events, cmd_execute, cmd_init, cmd_keygen, cmd_remove_signer,
    cmd_set_threshold, cmd_sign, cmd_signers, cmd_status, error_kind, exit_code, AppState, CliResult,
    InitOptions,
};
