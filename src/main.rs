//! play-deploy binary entry point.

use play_deploy::ui::output;

fn main() {
    if let Err(err) = play_deploy::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
