use std::path::PathBuf;

fn main() {
    let options = match parse_cli_flags() {
        Ok(Some(options)) => options,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    if let Err(err) = dex_tui::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_cli_flags() -> Result<Option<dex_tui::app::RunOptions>, String> {
    let mut options = dex_tui::app::RunOptions::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Dex-TUI {}", dex_tui::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!(
                    "Dex-TUI — Browse the PokeAPI creature catalog from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --demo               Browse the built-in sample catalog offline\n  --config <path>      Read configuration from <path> (default {})",
                    dex_tui::app::friendly_config_path()
                );
                return Ok(None);
            }
            "--demo" => options.demo = true,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| "--config requires a path".to_string())?;
                options.config_file = Some(PathBuf::from(path));
            }
            other => return Err(format!("unknown argument {other:?} (see --help)")),
        }
    }
    Ok(Some(options))
}
