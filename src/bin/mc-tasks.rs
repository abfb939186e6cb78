//! mc-tasks CLI - installs game versions on a simulated worker and shows
//! their aggregated progress.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

#[tokio::main]
async fn main() -> mc_tasks::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    mc_tasks::cli::run().await
}
