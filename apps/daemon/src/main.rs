use anyhow::Context;
use cadmin::domain::config::EngineConfig;
use cadmin::kernel::config::load_config;
use cadmin_daemon::Daemon;
use cadmin_logger::Logger;

fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let cfg: EngineConfig =
        load_config(path.as_deref()).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_config(&cfg.logging)?;

    Daemon::builder().config(cfg).build()?.run()
}
