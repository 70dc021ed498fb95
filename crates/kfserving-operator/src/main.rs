//! KFServing webhook - InferenceService defaulting and validation

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use kube::{Api, Client, CustomResourceExt};

use kfserving_common::crd::InferenceService;
use kfserving_common::Error;
use kfserving_common::telemetry::{init_telemetry, TelemetryConfig};
use kfserving_common::{
    DEFAULT_WEBHOOK_PORT, FIELD_MANAGER, INFERENCE_SERVICE_CONFIG_MAP_NAME, KFSERVING_NAMESPACE,
};
use kfserving_operator::{serve, webhook_router, ServerConfig, WebhookState};
use kfserving_registry::watcher::watch_config_map;
use kfserving_registry::RegistryStore;

/// KFServing - admission webhooks that default and validate InferenceServices
#[derive(Parser, Debug)]
#[command(
    name = "kfserving",
    version,
    about,
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Print the InferenceService CRD manifest and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    webhook: WebhookArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the admission webhook server (default mode)
    ///
    /// Installs the InferenceService CRD, watches the runtime registry
    /// ConfigMap, and serves the mutating and validating webhooks.
    Webhook(WebhookArgs),
}

#[derive(Args, Debug, Clone)]
struct WebhookArgs {
    /// Address the webhook server listens on
    #[arg(
        long,
        env = "KFSERVING_LISTEN_ADDR",
        default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_WEBHOOK_PORT))
    )]
    listen_addr: SocketAddr,

    /// PEM certificate chain; serve plain HTTP when neither cert nor key is set
    #[arg(long, env = "KFSERVING_TLS_CERT")]
    tls_cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, env = "KFSERVING_TLS_KEY")]
    tls_key: Option<PathBuf>,

    /// Namespace of the runtime registry ConfigMap
    #[arg(long, env = "KFSERVING_CONFIG_NAMESPACE", default_value = KFSERVING_NAMESPACE)]
    config_namespace: String,

    /// Name of the runtime registry ConfigMap
    #[arg(long, env = "KFSERVING_CONFIG_NAME", default_value = INFERENCE_SERVICE_CONFIG_MAP_NAME)]
    config_name: String,

    /// Emit JSON log lines
    #[arg(long, env = "KFSERVING_LOG_JSON", default_value_t = true, action = ArgAction::Set)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install aws-lc-rs crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&InferenceService::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    match cli.command {
        Some(Commands::Webhook(args)) => run_webhook(args).await,
        None => run_webhook(cli.webhook).await,
    }
}

/// Install or update the InferenceService CRD via server-side apply
async fn ensure_crd_installed(client: &Client) -> kfserving_common::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    tracing::info!("Installing InferenceService CRD...");
    crds.patch(
        "inferenceservices.serving.kubeflow.org",
        &params,
        &Patch::Apply(&InferenceService::crd()),
    )
    .await?;

    Ok(())
}

/// Run the webhook server until SIGINT/SIGTERM
async fn run_webhook(args: WebhookArgs) -> anyhow::Result<()> {
    init_telemetry(TelemetryConfig {
        service_name: "kfserving-webhook".to_string(),
        json: args.log_json,
    })?;

    let server_config = ServerConfig::new(args.listen_addr, args.tls_cert, args.tls_key)?;

    tracing::info!("KFServing webhook starting...");

    let client = Client::try_default().await.map_err(Error::from)?;

    if let Err(e) = ensure_crd_installed(&client).await {
        tracing::error!(
            error = %e,
            retryable = e.is_retryable(),
            "Failed to install InferenceService CRD"
        );
        return Err(e.into());
    }

    let store = Arc::new(RegistryStore::new());
    let watch_handle = {
        let store = store.clone();
        let namespace = args.config_namespace.clone();
        let name = args.config_name.clone();
        tokio::spawn(async move { watch_config_map(client, store, &namespace, &name).await })
    };

    let router = webhook_router(Arc::new(WebhookState::new(store.clone())));
    let result = serve(server_config, router, shutdown_signal()).await;

    tracing::info!("Shutting down webhook...");
    store.close();
    watch_handle.abort();

    result.map_err(Into::into)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
