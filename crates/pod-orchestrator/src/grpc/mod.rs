mod convert;
mod pod;

use proto::pod::orchestrator::v1::{self as pb, pod_service_server::PodService};
use tonic::{Request, Response, Status};

use crate::state::AppState;

pub struct GrpcService {
    state: AppState,
}

impl GrpcService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl PodService for GrpcService {
    async fn add_pod(
        &self,
        request: Request<pb::PodInfo>,
    ) -> Result<Response<pb::Response>, Status> {
        pod::add_pod(&self.state, request).await
    }

    async fn delete_pod(
        &self,
        request: Request<pb::PodId>,
    ) -> Result<Response<pb::Response>, Status> {
        pod::delete_pod(&self.state, request).await
    }

    async fn find_pod_by_id(
        &self,
        request: Request<pb::PodId>,
    ) -> Result<Response<pb::PodInfo>, Status> {
        pod::find_pod_by_id(&self.state, request).await
    }

    async fn update_pod(
        &self,
        request: Request<pb::PodInfo>,
    ) -> Result<Response<pb::Response>, Status> {
        pod::update_pod(&self.state, request).await
    }

    async fn find_pod_all(
        &self,
        request: Request<pb::FindAll>,
    ) -> Result<Response<pb::PodInfos>, Status> {
        pod::find_pod_all(&self.state, request).await
    }
}
