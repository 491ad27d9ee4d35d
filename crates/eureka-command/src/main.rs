use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use eureka_actuator::ActuatorState;
use eureka_client::{ClientConfig, EurekaClient, config::parse_seconds};
use eureka_core::InstanceConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "eureka")]
#[command(about = "Eureka service registry client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry base URL
    #[arg(long, env = "EUREKA_HOST", default_value = "http://localhost:8761/eureka")]
    eureka_host: String,

    #[arg(long, env = "EUREKA_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this process and keep it registered until interrupted
    Run(RunArgs),
    /// List applications and instances known to the registry
    Apps,
    /// Resolve an application to the address of a live instance
    Resolve {
        #[arg(long)]
        app: String,
    },
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, env = "EUREKA_INSTANCE_APP")]
    app: String,
    #[arg(long, env = "EUREKA_INSTANCE_HOST_NAME")]
    host_name: String,
    #[arg(long, env = "EUREKA_INSTANCE_IP_ADDR")]
    ip_addr: Option<String>,
    #[arg(long, env = "EUREKA_INSTANCE_ID")]
    instance_id: Option<String>,
    #[arg(long, env = "EUREKA_INSTANCE_PORT")]
    port: Option<u16>,
    #[arg(long, env = "EUREKA_INSTANCE_SECURE_PORT")]
    secure_port: Option<u16>,
    #[arg(long, env = "EUREKA_INSTANCE_VIP_ADDRESS")]
    vip_address: Option<String>,

    /// Seconds between registration attempts while unregistered
    #[arg(long, env = "EUREKA_REGISTER_RETRY_INTERVAL", default_value = "5", value_parser = seconds)]
    register_retry_interval: Duration,
    #[arg(long, env = "EUREKA_HEARTBEAT_INTERVAL", default_value = "5", value_parser = seconds)]
    heartbeat_interval: Duration,
    #[arg(long, env = "EUREKA_REGISTRY_INTERVAL", default_value = "15", value_parser = seconds)]
    registry_interval: Duration,
    /// Failed heartbeats tolerated before registering again
    #[arg(long, env = "EUREKA_RETRY_REGISTER_AFTER", default_value = "3")]
    retry_register_after: u32,

    /// Address the management endpoints listen on; defaults to the instance port
    #[arg(long, env = "EUREKA_ACTUATOR_BIND")]
    bind: Option<SocketAddr>,
}

fn seconds(raw: &str) -> Result<Duration, String> {
    parse_seconds("interval", raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run(args) => run(cli.eureka_host, args).await?,
        Commands::Apps => {
            let client = lookup_client(cli.eureka_host)?;
            client.fetch_registry().await?;

            let apps = client.applications();
            let mut names: Vec<_> = apps.keys().collect();
            names.sort();

            println!("{:<25} {:<30} {:<30}", "Application", "Instance", "Address");
            println!("{}", "-".repeat(85));
            for name in names {
                for instance in &apps[name] {
                    println!(
                        "{:<25} {:<30} {:<30}",
                        name,
                        instance.instance_id.as_deref().unwrap_or("-"),
                        instance.endpoint()
                    );
                }
            }
        }
        Commands::Resolve { app } => {
            let client = lookup_client(cli.eureka_host)?;
            client.fetch_registry().await?;
            let endpoint = client.resolve(&app, 0).await?;
            println!("{}", endpoint);
        }
    }

    Ok(())
}

async fn run(eureka_host: String, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig {
        eureka_host,
        register_retry_interval: args.register_retry_interval,
        heartbeat_interval: args.heartbeat_interval,
        registry_interval: args.registry_interval,
        retry_register_after: args.retry_register_after,
    };

    let mut instance = InstanceConfig::new(args.app, args.host_name);
    instance.ip_addr = args.ip_addr;
    instance.instance_id = args.instance_id;
    instance.port = args.port.map(Into::into);
    instance.secure_port = args.secure_port.map(Into::into);
    instance.vip_address = args.vip_address;

    let client = EurekaClient::new(config, instance)?;

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).ok();

    let state = ActuatorState::new(client.instance())
        .version(env!("CARGO_PKG_VERSION"))
        .prometheus(handle);
    let app = eureka_actuator::router(state);

    let port = client.instance().active_port().unwrap_or(8080);
    let addr = args.bind.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], port)));

    client.start();

    tracing::info!("actuator listening on {}", addr);
    let server = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(leave_registry_on_signal(client.clone()));

    if let Err(e) = server.await {
        tracing::error!("server error: {}", e);
        if let Err(e) = client.shutdown_and_deregister().await {
            tracing::warn!("deregistration failed: {}", e);
        }
    }

    Ok(())
}

/// Client used only to read the registry; it never registers.
fn lookup_client(eureka_host: String) -> Result<EurekaClient, Box<dyn std::error::Error>> {
    let instance = InstanceConfig::new("eureka-cli", "localhost");
    Ok(EurekaClient::new(ClientConfig::new(eureka_host), instance)?)
}

/// Waits for SIGINT or SIGTERM, then stops the loops and deregisters before the
/// actuator stops serving.
async fn leave_registry_on_signal(client: EurekaClient) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for interrupt: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = interrupt => "interrupt",
        _ = terminate => "terminate",
    };

    tracing::info!(signal, "leaving the registry");
    if let Err(e) = client.shutdown_and_deregister().await {
        tracing::warn!("deregistration failed: {}", e);
    }
}
