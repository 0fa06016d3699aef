use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so that FA_WEBHOOK_SECRET never ends up in a terminal
    const DISPLAY_ENVS: [&str; 16] = [
        "RUST_LOG",
        "FA_HOST",
        "FA_PORT",
        "FA_DATABASE_URL",
        "FA_DB_MAX_CONNECTIONS",
        "FA_USE_X_FORWARDED_FOR",
        "FA_USE_FORWARDED",
        "FA_WEBHOOK_SIGNATURE_HEADER",
        "FA_WEBHOOK_SIGNATURE_CHECKS",
        "FA_WEBHOOK_TOLERANCE_SECS",
        "FA_GATEWAY_IP_WHITELIST",
        "FA_LEADERBOARD_STALENESS_SECS",
        "FA_REFRESH_LEADERBOARDS_ON_SETTLE",
        "FA_STEP_TIMEOUT_SECS",
        "FA_RECONCILIATION_INTERVAL_SECS",
        "FA_RECONCILIATION_GRACE_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
