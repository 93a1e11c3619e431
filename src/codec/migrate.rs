use super::packed::Packed;
use std::collections::HashMap;

type Route<S> = Box<dyn Fn(&[u8]) -> anyhow::Result<S> + Send + Sync>;

/// Register-only migration table for one state type.
///
/// Routes are keyed by the (version, size) pair of the persisted record,
/// which is sufficient to identify the layout generation that wrote it. A
/// route receives only the state-bytes slice and returns a current-version
/// value. Chains are expressed by registering intermediate hops explicitly;
/// the registry does not compose routes on its own.
pub struct Migrations<S> {
    routes: HashMap<(u8, usize), Route<S>>,
}

impl<S> Default for Migrations<S> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }
}

impl<S> Migrations<S>
where
    S: Packed,
{
    pub fn register<F>(&mut self, version: u8, size: usize, route: F)
    where
        F: Fn(&[u8]) -> anyhow::Result<S> + Send + Sync + 'static,
    {
        self.routes.insert((version, size), Box::new(route));
        log::info!("registered migration route from v{} ({} bytes)", version, size);
    }

    /// Upgrade an old record, if a route is registered for its generation.
    pub fn migrate(&self, version: u8, bytes: &[u8]) -> Option<anyhow::Result<S>> {
        self.routes
            .get(&(version, bytes.len()))
            .map(|route| route(bytes))
    }
}
