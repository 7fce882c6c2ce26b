use std::env;
use std::process;

use log::{error, info};

use uwb_locator::{AnchorRegistry, CsvSink, Server, Settings};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let Some(registry_path) = args.next() else {
        eprintln!("usage: uwb-locator <anchors.json> [bind-addr] [output.csv]");
        process::exit(2);
    };
    let mut settings = Settings::default();
    if let Some(bind_addr) = args.next() {
        settings.bind_addr = bind_addr;
    }
    let output_path = args.next().unwrap_or_else(|| "fixes.csv".to_string());

    let registry = match AnchorRegistry::load(&registry_path) {
        Ok(r) => r,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    info!("loaded {} anchor(s) from {}", registry.len(), registry_path);

    let mut sink = match CsvSink::create(&output_path) {
        Ok(s) => s,
        Err(e) => {
            error!("cannot open output file {}: {}", output_path, e);
            process::exit(1);
        }
    };

    let server = Server::new(registry, settings);
    if let Err(e) = server.run(&mut sink) {
        error!("server stopped: {}", e);
        process::exit(1);
    }
}
