#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = taskometer_server::config::Config::from_env()?;
    taskometer_server::web::start_web_server(config).await
}
