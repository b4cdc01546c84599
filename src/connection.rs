use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use kube::{
    Client, Config,
    config::{KubeConfigOptions, Kubeconfig},
};
use tracing::debug;

use crate::error::ConfigError;

/// Where to find connection settings and what to override in them.
#[derive(Debug, Clone, Default)]
pub struct ConnectionDescriptor {
    /// Kubeconfig file to read.
    pub kubeconfig: PathBuf,
    /// Context to use instead of the file's current-context.
    pub context: Option<String>,
    /// Namespace to use instead of the context's namespace.
    pub namespace: Option<String>,
    /// Deadline applied to every response read.
    pub timeout: Option<Duration>,
}

impl ConnectionDescriptor {
    pub fn new(kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Per-user default kubeconfig location, `~/.kube/config`.
pub fn default_kubeconfig_path() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".kube").join("config"))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Resolved, immutable connection settings.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    config: Config,
    context: Option<String>,
    default_namespace: Option<String>,
}

impl ConnectionConfig {
    /// Settings for a bare endpoint without credentials, such as a local API proxy.
    pub fn from_endpoint(endpoint: &str) -> Result<Self, ConfigError> {
        let cluster_url = endpoint
            .parse()
            .map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
        Ok(Self {
            config: Config::new(cluster_url),
            context: None,
            default_namespace: None,
        })
    }

    pub fn endpoint(&self) -> String {
        self.config.cluster_url.to_string()
    }

    /// Context these settings were resolved from, if they came from a kubeconfig.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Namespace to query when the caller does not name one.
    pub fn namespace_or_default(&self) -> &str {
        self.default_namespace().unwrap_or("default")
    }

    /// Build the reusable connection handle.
    pub fn connect(&self) -> Result<Connection, ConfigError> {
        let client = Client::try_from(self.config.clone()).map_err(ConfigError::Client)?;
        Ok(Connection {
            client,
            default_namespace: self.default_namespace.clone(),
        })
    }
}

/// Reusable handle shared by every discovery and listing call in a session.
#[derive(Clone)]
pub struct Connection {
    client: Client,
    default_namespace: Option<String>,
}

impl Connection {
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }
}

/// Resolve a descriptor into connection settings.
///
/// Reads only the local kubeconfig file. Fails when the file is absent or
/// malformed, or when the selected context lacks a cluster endpoint or a user.
pub async fn resolve(descriptor: &ConnectionDescriptor) -> Result<ConnectionConfig, ConfigError> {
    let kubeconfig = read_kubeconfig(&descriptor.kubeconfig)?;
    let context = determine_context(descriptor.context.as_deref(), &kubeconfig)?;
    validate_context(&context, &kubeconfig)?;

    let default_namespace = descriptor
        .namespace
        .clone()
        .filter(|ns| !ns.is_empty())
        .or_else(|| context_namespace(&context, &kubeconfig));

    let options = KubeConfigOptions {
        context: Some(context.clone()),
        ..Default::default()
    };
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;
    if let Some(timeout) = descriptor.timeout {
        config.read_timeout = Some(timeout);
    }
    if let Some(namespace) = &default_namespace {
        config.default_namespace = namespace.clone();
    }

    debug!(
        context = %context,
        endpoint = %config.cluster_url,
        namespace = ?default_namespace,
        "resolved connection"
    );

    Ok(ConnectionConfig {
        config,
        context: Some(context),
        default_namespace,
    })
}

fn read_kubeconfig(path: &Path) -> Result<Kubeconfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    Kubeconfig::read_from(path).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Detects the context to use.
///
/// Context determination follows this priority:
/// 1. Uses the context if explicitly specified.
/// 2. Uses the current context of the kubeconfig.
pub fn determine_context(
    context: Option<&str>,
    kubeconfig: &Kubeconfig,
) -> Result<String, ConfigError> {
    let name = match context {
        Some(context) => context.to_string(),
        None => kubeconfig
            .current_context
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::NoCurrentContext)?,
    };

    if kubeconfig.contexts.iter().any(|c| c.name == name) {
        Ok(name)
    } else {
        Err(ConfigError::UnknownContext(name))
    }
}

/// Determines the namespace to query.
///
/// Namespace determination follows this priority:
/// 1. Uses the namespace if explicitly specified.
/// 2. Uses the default namespace of the context.
/// 3. Uses "default".
///
/// An empty namespace counts as unspecified.
pub fn determine_namespace(namespace: Option<&str>, context: &str, kubeconfig: &Kubeconfig) -> String {
    namespace
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .or_else(|| context_namespace(context, kubeconfig))
        .unwrap_or_else(|| String::from("default"))
}

fn context_namespace(context: &str, kubeconfig: &Kubeconfig) -> Option<String> {
    kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == context)
        .and_then(|c| c.context.as_ref())
        .and_then(|ctx| ctx.namespace.clone())
        .filter(|ns| !ns.is_empty())
}

fn validate_context(context: &str, kubeconfig: &Kubeconfig) -> Result<(), ConfigError> {
    let ctx = kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == context)
        .and_then(|c| c.context.as_ref())
        .ok_or_else(|| ConfigError::UnknownContext(context.to_string()))?;

    let cluster = kubeconfig
        .clusters
        .iter()
        .find(|c| c.name == ctx.cluster)
        .ok_or_else(|| ConfigError::UnknownCluster {
            context: context.to_string(),
            cluster: ctx.cluster.clone(),
        })?;
    let has_server = cluster
        .cluster
        .as_ref()
        .and_then(|c| c.server.as_deref())
        .is_some_and(|server| !server.is_empty());
    if !has_server {
        return Err(ConfigError::MissingEndpoint(cluster.name.clone()));
    }

    let user = ctx
        .user
        .as_deref()
        .filter(|user| !user.is_empty())
        .ok_or_else(|| ConfigError::MissingCredentials(context.to_string()))?;
    let known_user = kubeconfig
        .auth_infos
        .iter()
        .any(|a| a.name == user && a.auth_info.is_some());
    if !known_user {
        return Err(ConfigError::UnknownUser {
            context: context.to_string(),
            user: user.to_string(),
        });
    }

    Ok(())
}
