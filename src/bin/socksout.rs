use std::env;

use futures::future::join_all;
use log::{error, info};
use socksout::config::Config;
use socksout::outbound::Outbound;
use socksout::inbound::run_http_proxy;
use tokio::runtime::Runtime;

fn main() {
    let mut args = env::args();
    if args.len() != 2 {
        println!("Usage: {} config.toml", args.next().unwrap_or_default());
        return;
    }

    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let path = args.nth(1).unwrap_or_default();
    let inbounds = match Config::load(&path).and_then(Config::build) {
        Ok(inbounds) => inbounds,
        Err(err) => {
            error!("{}: {}", path, err);
            std::process::exit(1);
        }
    };

    for (listen, outbound) in &inbounds {
        info!("Inbound {} -> {} {}", listen, outbound.kind(), outbound.name());
    }

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            error!("runtime: {}", err);
            std::process::exit(1);
        }
    };

    rt.block_on(async move {
        let servers = inbounds
            .iter()
            .map(|(listen, outbound)| run_http_proxy(listen, outbound.clone()));

        for (result, (listen, _)) in join_all(servers).await.into_iter().zip(&inbounds) {
            if let Err(err) = result {
                error!("{}: {}", listen, err);
            }
        }
    });
}
