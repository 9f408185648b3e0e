use crate::storage::incidents::IncidentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: IncidentStore,
}
