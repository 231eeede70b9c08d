fn main() {
    init_tracing();

    if handle_cli_flags() {
        return;
    }

    if let Err(err) = staffboard::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

// Diagnostics stay quiet unless asked for; the TUI owns the terminal.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("STAFFBOARD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_cli_flags() -> bool {
    let mut saw_flag = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("staffboard {}", staffboard::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "staffboard — Browse employee posts from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message"
                );
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}
