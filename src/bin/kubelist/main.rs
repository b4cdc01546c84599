use std::{io::Write, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, anyhow};
use clap::{CommandFactory, Parser, ValueEnum};
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{Namespace, Pod},
};
use kubelist::{
    Connection, ConnectionDescriptor, DiscoverClient, DiscoverySnapshot, GenericClient,
    ResourceIdentity, TypedClient,
    claputil::{clap_complete::CompleteEnv, context_value_completer},
    connection::default_kubeconfig_path,
    convert,
    retry::{RetryPolicy, retry_with_policy},
};
use tracing::info;

mod print;

#[derive(Debug, Parser)]
#[command(
    name = "kubelist",
    version,
    about = "List Kubernetes resources through typed, generic and discovery clients"
)]
struct Cli {
    /// Path to the kubeconfig file [default: ~/.kube/config]
    #[arg(long, value_name = "PATH")]
    kubeconfig: Option<PathBuf>,

    /// Override the Kubernetes context to target
    #[arg(long, add = context_value_completer())]
    context: Option<String>,

    /// Namespace to list [default: the context's namespace, else "default"]
    #[arg(short, long)]
    namespace: Option<String>,

    /// List across all namespaces
    #[arg(short = 'A', long, conflicts_with = "namespace")]
    all_namespaces: bool,

    /// Which clients to run
    #[arg(long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Resource listed by the generic client, resolved through discovery
    /// (name, singular name, short name or `name.group`)
    #[arg(long, default_value = "pods")]
    resource: String,

    /// Per-request read timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Attempts per request, including the first one
    #[arg(long, default_value = "1")]
    attempts: NonZeroUsize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Mode {
    All,
    Typed,
    Generic,
    Discovery,
}

fn init_tracing() {
    let env = std::env::var("KUBELIST_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    CompleteEnv::with_factory(Cli::command).complete();
    init_tracing();
    let cli = Cli::parse();

    let kubeconfig = match &cli.kubeconfig {
        Some(path) => path.clone(),
        None => default_kubeconfig_path()?,
    };
    let descriptor = ConnectionDescriptor {
        kubeconfig,
        context: cli.context.clone(),
        namespace: cli.namespace.clone(),
        timeout: cli.timeout.map(Duration::from_secs),
    };
    let config = kubelist::resolve(&descriptor)
        .await
        .with_context(|| format!("failed to load {:?}", descriptor.kubeconfig))?;
    let connection = config.connect()?;
    let namespace = (!cli.all_namespaces).then(|| config.namespace_or_default().to_string());
    info!(context = ?config.context(), ns = ?namespace, mode = ?cli.mode, "kubelist invoked");

    let session = Session {
        connection,
        namespace,
        attempts: cli.attempts,
    };
    let mut out = std::io::stdout().lock();

    if matches!(cli.mode, Mode::All | Mode::Typed) {
        session.typed(&mut out).await?;
    }

    if matches!(cli.mode, Mode::All | Mode::Discovery | Mode::Generic) {
        let snapshot = session.discover().await?;
        if matches!(cli.mode, Mode::All | Mode::Discovery) {
            writeln!(out)?;
            print::resources(&mut out, snapshot.group_versions())?;
        }
        if matches!(cli.mode, Mode::All | Mode::Generic) {
            writeln!(out)?;
            session.generic(&mut out, &snapshot, &cli.resource).await?;
        }
    }

    out.flush()?;
    Ok(())
}

struct Session {
    connection: Connection,
    namespace: Option<String>,
    attempts: NonZeroUsize,
}

impl Session {
    fn policy<E: kubelist::retry::Transient>(&self) -> RetryPolicy<E> {
        RetryPolicy::default().with_max_attempts(self.attempts)
    }

    async fn typed(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let ns = self.namespace.as_deref();

        let pods = TypedClient::<Pod>::new(self.connection.client());
        let pods = retry_with_policy(&self.policy(), || pods.list(ns))
            .await
            .context("failed to list pods")?;
        print::pods(out, &pods)?;

        let deployments = TypedClient::<Deployment>::new(self.connection.client());
        let deployments = retry_with_policy(&self.policy(), || deployments.list(ns))
            .await
            .context("failed to list deployments")?;
        writeln!(out)?;
        print::deployments(out, &deployments)?;
        Ok(())
    }

    async fn discover(&self) -> anyhow::Result<DiscoverySnapshot> {
        let discover = DiscoverClient::new(self.connection.client());
        retry_with_policy(&self.policy(), || discover.snapshot())
            .await
            .context("failed to discover server resources")
    }

    async fn generic(
        &self,
        out: &mut impl Write,
        snapshot: &DiscoverySnapshot,
        target: &str,
    ) -> anyhow::Result<()> {
        let (identity, resource) = snapshot
            .resolve(target)
            .ok_or_else(|| anyhow!("resource {target:?} is not served by this cluster"))?;
        // cluster-scoped kinds have no namespace segment
        let ns = if resource.namespaced {
            self.namespace.as_deref()
        } else {
            None
        };

        let client = GenericClient::new(self.connection.client());
        let list = retry_with_policy(&self.policy(), || client.list(&identity, ns))
            .await
            .with_context(|| format!("failed to list {identity}"))?;

        if identity == ResourceIdentity::of::<Pod>() {
            print::pods(out, &convert::<Pod>(&list)?)?;
        } else if identity == ResourceIdentity::of::<Deployment>() {
            print::deployments(out, &convert::<Deployment>(&list)?)?;
        } else if identity == ResourceIdentity::of::<Namespace>() {
            print::namespaces(out, &convert::<Namespace>(&list)?)?;
        } else {
            print::documents(out, &list)?;
        }
        Ok(())
    }
}
