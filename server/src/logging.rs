const DEFAULT_FILTER: &str =
    "server=info,page_service=info,datastore=info,playlist_fetcher=info,mock_upstream=info";

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
