//! Phase 7: delete every test resource still registered, newest first.

use log::{info, warn};

use super::driver::ProbeEngine;
use crate::client::{HttpMethod, ScimTransport};
use crate::probe::checks::{Phase, ProbeCheck};

impl<T: ScimTransport> ProbeEngine<T> {
    /// Delete the remaining test resources in reverse creation order.
    ///
    /// With `skip_cleanup` the resources are left in place and each one is
    /// logged with the name prefix that identifies it.
    pub async fn cleanup(&mut self) {
        let phase = Phase::Cleanup;
        let pending = self.created.cleanup_order();
        if pending.is_empty() {
            info!("{}: nothing to clean up", phase);
            return;
        }

        if self.config.skip_cleanup {
            for resource in &pending {
                warn!(
                    "Cleanup skipped: {} left on the server (names start with '{}')",
                    resource.path(),
                    self.config.name_prefix
                );
                self.checks.push(
                    ProbeCheck::skip(format!("DELETE {}", resource.path()), phase).with_message(
                        format!(
                            "Skipped: cleanup disabled; remove manually (prefix '{}')",
                            self.config.name_prefix
                        ),
                    ),
                );
            }
            return;
        }

        info!("{}: deleting {} test resources", phase, pending.len());
        for resource in pending {
            let path = resource.path();
            let name = format!("DELETE {}", path);
            self.begin(&name, phase);

            let response = match self.client.delete(&path).await {
                Ok(response) => response,
                Err(error) => {
                    warn!("Abandoned {}: {}", path, error);
                    self.checks
                        .push(ProbeCheck::client_failure(&name, phase, &error));
                    continue;
                }
            };
            let evidence = self
                .evidence(HttpMethod::Delete, &path, None)
                .with_response(&response);

            let check = if response.is_success() || response.status == 404 {
                self.created.confirm_deleted(resource.kind, &resource.id);
                match response.status {
                    404 => ProbeCheck::pass(&name, phase).with_message("Already removed (404)"),
                    _ => ProbeCheck::pass(&name, phase),
                }
            } else {
                warn!(
                    "Abandoned {} after {} (names start with '{}')",
                    path, response.status, self.config.name_prefix
                );
                Self::status_check(&name, phase, "204", response.status)
            };
            self.checks.push(check.with_evidence(evidence));
        }
    }
}
