use carrot_config::Config;

/// Print spawn infos to the log.
pub fn dump_spawn_info(config: &Config) {
    carrot_log::info!("launching carrot");
    carrot_log::info!(
        "  broker: amqp://{}:{} exchange {:?}",
        config.broker.host,
        config.broker.port,
        config.broker.exchange
    );
    carrot_log::info!(
        "  influx: {} org {:?} bucket {:?}",
        config.influx.url,
        config.influx.org,
        config.influx.bucket
    );
    carrot_log::info!("  log level: {}", config.logging.level);
}
