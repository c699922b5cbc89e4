use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` takes precedence over `filter`.
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Start the Prometheus scrape endpoint on `listen`.
#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(listen: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    use metrics_exporter_prometheus::PrometheusBuilder;

    let addr: SocketAddr = listen.parse().with_context(|| format!("bad metrics_listen {listen:?}"))?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    tracing::info!(%addr, "Prometheus exporter listening on /metrics");
    metrics::gauge!("capwatch_up").set(1.0);
    Ok(())
}

/// No exporter compiled in; only the address is checked.
#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(listen: &str) -> anyhow::Result<()> {
    let _: SocketAddr = listen
        .parse()
        .map_err(|e| anyhow::anyhow!("bad metrics_listen {listen:?}: {e}"))?;
    Ok(())
}
