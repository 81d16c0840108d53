use colored::Colorize;

fn main() {
    if let Err(e) = kuralview::app::run_cli() {
        eprintln!("{}", e.red());
        std::process::exit(1);
    }
}
