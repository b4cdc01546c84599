use std::ffi::OsStr;

use clap_complete::engine::{ArgValueCompleter, CompletionCandidate};
use kube::config::Kubeconfig;

pub use clap_complete;

/// Create an `ArgValueCompleter` that lists contexts from the active kubeconfig.
///
/// The current context is offered first and tagged `[current]`, with the
/// context's cluster and namespace as help text.
pub fn context_value_completer() -> ArgValueCompleter {
    ArgValueCompleter::new(|input: &OsStr| -> Vec<CompletionCandidate> {
        let Ok(kubeconfig) = Kubeconfig::read() else {
            return Vec::new();
        };
        let input = input.to_string_lossy();
        context_candidates(&kubeconfig, input.trim())
    })
}

fn context_candidates(kubeconfig: &Kubeconfig, prefix: &str) -> Vec<CompletionCandidate> {
    let current = kubeconfig.current_context.as_deref();
    let mut completions = Vec::new();

    for named in kubeconfig
        .contexts
        .iter()
        .filter(|named| named.name.starts_with(prefix))
    {
        let is_current = current == Some(named.name.as_str());

        let mut details = Vec::new();
        if is_current {
            details.push(String::from("[current]"));
        }
        if let Some(ctx) = &named.context {
            details.push(format!("cluster={}", ctx.cluster));
            if let Some(namespace) = &ctx.namespace {
                details.push(format!("namespace={namespace}"));
            }
        }

        let mut candidate = CompletionCandidate::new(named.name.as_str());
        if !details.is_empty() {
            candidate = candidate.help(Some(details.join(" ").into()));
        }

        if is_current {
            completions.insert(0, candidate.display_order(Some(0)));
        } else {
            completions.push(candidate);
        }
    }

    completions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_context_comes_first() {
        let kubeconfig = Kubeconfig::from_yaml(
            r#"
current-context: prod
contexts:
- name: dev
  context:
    cluster: dev-cluster
- name: prod
  context:
    cluster: prod-cluster
    namespace: web
- name: staging
  context:
    cluster: staging-cluster
"#,
        )
        .unwrap();

        let names: Vec<_> = context_candidates(&kubeconfig, "")
            .iter()
            .map(|c| c.get_value().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["prod", "dev", "staging"]);

        let filtered = context_candidates(&kubeconfig, "st");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].get_value(), "staging");
    }
}
