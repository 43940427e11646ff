use crate::service::PodService;
use crate::storage::PodStore;

#[derive(Clone)]
pub struct AppState {
    pub pod_service: PodService,
    pub pod_store: PodStore,
}
