use proto::pod::orchestrator::v1 as pb;
use tonic::{Request, Response, Status};

use crate::model::PodSpec;
use crate::service::DeleteOutcome;
use crate::state::AppState;

pub async fn add_pod(
    state: &AppState,
    request: Request<pb::PodInfo>,
) -> Result<Response<pb::Response>, Status> {
    let pod = PodSpec::from(request.into_inner());

    let id = state.pod_service.add(pod).await.inspect_err(|e| {
        tracing::error!("AddPod failed: {}", e);
    })?;

    tracing::info!("AddPod success pod id {}", id);
    Ok(Response::new(pb::Response::default()))
}

pub async fn update_pod(
    state: &AppState,
    request: Request<pb::PodInfo>,
) -> Result<Response<pb::Response>, Status> {
    let pod = PodSpec::from(request.into_inner());

    state.pod_service.update(pod).await.inspect_err(|e| {
        tracing::error!("UpdatePod failed: {}", e);
    })?;

    Ok(Response::new(pb::Response::default()))
}

pub async fn delete_pod(
    state: &AppState,
    request: Request<pb::PodId>,
) -> Result<Response<pb::Response>, Status> {
    let id = request.into_inner().id;

    let outcome = state.pod_service.delete(id).await.inspect_err(|e| {
        tracing::error!("DeletePod {} failed: {}", id, e);
    })?;

    // the deployment is gone either way, a leftover row is only reported
    let msg = match outcome {
        DeleteOutcome::Deleted { .. } => String::new(),
        DeleteOutcome::WorkloadOnly { reason } => reason,
    };
    Ok(Response::new(pb::Response { msg }))
}

pub async fn find_pod_by_id(
    state: &AppState,
    request: Request<pb::PodId>,
) -> Result<Response<pb::PodInfo>, Status> {
    let id = request.into_inner().id;

    let pod = state.pod_service.find_by_id(id).await.inspect_err(|e| {
        tracing::error!("FindPodByID {} failed: {}", id, e);
    })?;

    Ok(Response::new(pb::PodInfo::from(pod)))
}

pub async fn find_pod_all(
    state: &AppState,
    _request: Request<pb::FindAll>,
) -> Result<Response<pb::PodInfos>, Status> {
    let pods = state.pod_service.find_all().await.inspect_err(|e| {
        tracing::error!("FindPodAll failed: {}", e);
    })?;

    Ok(Response::new(pb::PodInfos {
        pod_infos: pods.into_iter().map(pb::PodInfo::from).collect(),
    }))
}
