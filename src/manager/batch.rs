//! start/stop/restart over several named services, in argument order

use super::{Clock, Manager, Service, ServiceError};
use crate::package::Registry;
use crate::supervisor::Supervisor;
use crate::template::TemplateSource;

/// Result of one service in a batch
#[derive(Debug)]
pub struct Outcome {
    pub name: String,
    pub label: String,
    pub result: Result<(), ServiceError>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl<R: Registry, S: Supervisor, C: Clock> Manager<R, S, C> {
    /// Resolve every name up front; the first unknown name fails the batch
    pub async fn services(&self, names: &[String]) -> Result<Vec<Service<'_, R, S, C>>, ServiceError> {
        let mut services = Vec::with_capacity(names.len());
        for name in names {
            services.push(self.service(name).await?);
        }
        Ok(services)
    }

    pub async fn start_all(
        &self,
        names: &[String],
        template: Option<&TemplateSource>,
    ) -> Result<Vec<Outcome>, ServiceError> {
        let mut outcomes = Vec::new();
        for service in self.services(names).await? {
            let result = service.start(template).await.map(|_| ());
            outcomes.push(outcome(&service, result));
        }
        Ok(outcomes)
    }

    pub async fn stop_all(&self, names: &[String]) -> Result<Vec<Outcome>, ServiceError> {
        let mut outcomes = Vec::new();
        for service in self.services(names).await? {
            let result = service.stop().await;
            outcomes.push(outcome(&service, result));
        }
        Ok(outcomes)
    }

    pub async fn restart_all(&self, names: &[String]) -> Result<Vec<Outcome>, ServiceError> {
        let mut outcomes = Vec::new();
        for service in self.services(names).await? {
            let result = service.restart().await.map(|_| ());
            outcomes.push(outcome(&service, result));
        }
        Ok(outcomes)
    }
}

fn outcome<R: Registry, S: Supervisor, C: Clock>(
    service: &Service<'_, R, S, C>,
    result: Result<(), ServiceError>,
) -> Outcome {
    if let Err(e) = &result {
        log::debug!("{}: {}", service.label(), e);
    }
    Outcome {
        name: service.name().to_string(),
        label: service.label().to_string(),
        result,
    }
}
