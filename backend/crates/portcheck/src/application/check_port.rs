//! Check Port Use Case

use crate::domain::entities::{AuditRecord, ProbeOutcome, ProbeRequest};
use crate::domain::repository::{AuditLog, PortProber};
use crate::domain::restricted_ports::RestrictedPortTable;
use crate::domain::value_objects::{ClientId, Port};
use crate::error::{PortCheckError, PortCheckResult};
use platform::captcha::CaptchaVerifier;
use platform::rate_limit::RateLimitStore;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

/// Input DTO for check port
#[derive(Debug, Clone)]
pub struct CheckPortInput {
    /// Resolved by the transport layer; `None` if it could not be
    pub client_ip: Option<IpAddr>,
    /// Raw port field as submitted
    pub port: String,
    pub captcha_token: String,
}

/// Output DTO for check port
#[derive(Debug, Clone)]
pub struct CheckPortOutput {
    pub outcome: ProbeOutcome,
}

impl CheckPortOutput {
    pub fn message(&self) -> String {
        self.outcome.message()
    }
}

/// Check Port Use Case
///
/// Steps, terminal at the first failure:
/// identify → admit → verify captcha → validate port → probe → audit → label.
/// Nothing is probed or audited unless the first four steps pass.
pub struct CheckPortUseCase<R, V, P, A>
where
    R: RateLimitStore,
    V: CaptchaVerifier,
    P: PortProber,
    A: AuditLog,
{
    rate_limiter: Arc<R>,
    captcha: Arc<V>,
    prober: Arc<P>,
    audit_log: Arc<A>,
    restricted: &'static RestrictedPortTable,
}

impl<R, V, P, A> CheckPortUseCase<R, V, P, A>
where
    R: RateLimitStore,
    V: CaptchaVerifier,
    P: PortProber,
    A: AuditLog,
{
    pub fn new(rate_limiter: Arc<R>, captcha: Arc<V>, prober: Arc<P>, audit_log: Arc<A>) -> Self {
        Self {
            rate_limiter,
            captcha,
            prober,
            audit_log,
            restricted: RestrictedPortTable::standard(),
        }
    }

    pub async fn execute(&self, input: CheckPortInput) -> PortCheckResult<CheckPortOutput> {
        let client = input
            .client_ip
            .map(ClientId::new)
            .ok_or(PortCheckError::InvalidIdentifier)?;

        let limit = self
            .rate_limiter
            .check_and_increment(&client.to_string(), Instant::now())
            .await?;

        if !limit.allowed {
            tracing::info!(client = %client, "Client over rate limit");
            return Err(PortCheckError::RateLimited {
                retry_after: limit.retry_after,
            });
        }

        if !self
            .captcha
            .verify(&input.captcha_token, Some(client.ip()))
            .await
        {
            tracing::info!(client = %client, "Captcha verification failed");
            return Err(PortCheckError::CaptchaInvalid);
        }

        let port = Port::parse(&input.port)?;

        let request = ProbeRequest::for_client(client, port);
        let reachable = self.prober.probe(&request).await;

        self.audit_log
            .record(AuditRecord::new(client, port, reachable))
            .await;

        let outcome = ProbeOutcome {
            port,
            reachable,
            restricted: self.restricted.contains(port.get()),
        };

        tracing::info!(
            client = %client,
            port = port.get(),
            reachable,
            restricted = outcome.restricted,
            remaining = limit.remaining,
            "Port checked"
        );

        Ok(CheckPortOutput { outcome })
    }
}
