use anyhow::Context;
use mangashelf::{
    configuration::Config,
    startup::{Application, Command},
    telemetry::{get_subscriber, init_subscriber},
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("mangashelf".into(), "info".into(), std::io::stderr);
    init_subscriber(subscriber)?;

    let command = Command::parse(std::env::args().skip(1))?;
    let config = Config::new().context("Failed to read configuration.")?;

    let application = Application::build(config).context("Failed creating client.")?;

    application.run(command).await
}
