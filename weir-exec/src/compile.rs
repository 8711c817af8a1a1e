use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use weir_core::template::{ERROR_RESOURCE, INPUT_RESOURCE};
use weir_core::types::{Call, Flow, Functions, Manifest};
use weir_core::{checks, planner, ManifestError};
use weir_transport::codec::Constructor;
use weir_transport::{BoundEndpoint, Caller, Listener, TransportError};

use crate::dispatch::{CompiledForward, EndpointDispatcher};
use crate::error::ExecutionError;
use crate::errs::CompiledErrorObject;
use crate::events::{EventSink, NoOpEventSink};
use crate::executor::{CompiledCall, CompiledNode};
use crate::flow::FlowManager;

const DEFAULT_ROLLBACK_BUDGET: Duration = Duration::from_secs(30);

/// Explicit plug-in bundle passed at construction. Replaces process-wide
/// registries; everything a manifest names must be present here.
pub struct Options {
    pub callers: BTreeMap<String, Arc<dyn Caller>>,
    pub codecs: BTreeMap<String, Arc<dyn Constructor>>,
    pub listeners: BTreeMap<String, Arc<dyn Listener>>,
    pub functions: Functions,
    pub events: Arc<dyn EventSink>,
    /// Non-cancellable budget granted to the rollback pass when an endpoint
    /// carries no deadline of its own.
    pub rollback_budget: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            callers: BTreeMap::new(),
            codecs: BTreeMap::new(),
            listeners: BTreeMap::new(),
            functions: Functions::new(),
            events: Arc::new(NoOpEventSink),
            rollback_budget: DEFAULT_ROLLBACK_BUDGET,
        }
    }
}

/// The bound runtime: every listener routed with its endpoints.
pub struct Runtime {
    listeners: Vec<Arc<dyn Listener>>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Runtime {
    pub fn listeners(&self) -> &[Arc<dyn Listener>] {
        &self.listeners
    }

    /// Serve every listener until closed. The first listener error wins.
    pub async fn serve(&self) -> Result<(), ExecutionError> {
        let mut handles = Vec::with_capacity(self.listeners.len());
        for listener in &self.listeners {
            let listener = listener.clone();
            handles.push(tokio::spawn(async move { listener.serve().await }));
        }

        for handle in handles {
            handle
                .await
                .map_err(|e| ExecutionError::Transport(TransportError::Listener(e.to_string())))??;
        }
        Ok(())
    }

    pub async fn close(&self) -> Result<(), ExecutionError> {
        for listener in &self.listeners {
            listener.close().await?;
        }
        Ok(())
    }
}

/// Validate a manifest, compile its flows and hand every endpoint to its
/// listener. This is the entire startup pass; nothing re-parses or
/// re-analyzes per invocation afterwards.
pub async fn bind(manifest: &Manifest, options: &Options) -> Result<Runtime, ExecutionError> {
    checks::check_manifest(manifest)?;

    let mut flows: BTreeMap<String, (Arc<FlowManager>, &Flow)> = BTreeMap::new();
    for flow in &manifest.flows {
        let manager = compile_flow(manifest, options, flow)?;
        flows.insert(flow.name.clone(), (Arc::new(manager), flow));
    }

    let mut grouped: BTreeMap<String, Vec<BoundEndpoint>> = BTreeMap::new();
    for endpoint in &manifest.endpoints {
        if !options.listeners.contains_key(&endpoint.listener) {
            return Err(ManifestError::UnknownListener(endpoint.listener.clone()).into());
        }

        let (manager, flow) = flows
            .get(&endpoint.flow)
            .ok_or_else(|| ManifestError::UnknownFlow(endpoint.flow.clone()))?;

        let dispatcher =
            compile_endpoint(manifest, options, manager.clone(), flow, &endpoint.codec, &endpoint.options)?;

        grouped
            .entry(endpoint.listener.clone())
            .or_default()
            .push(BoundEndpoint {
                flow: flow.name.clone(),
                options: endpoint.options.clone(),
                dispatch: Arc::new(dispatcher),
            });
    }

    let mut listeners = Vec::new();
    for (name, endpoints) in grouped {
        let listener = options
            .listeners
            .get(&name)
            .cloned()
            .ok_or_else(|| ManifestError::UnknownListener(name.clone()))?;

        info!(listener = %name, endpoints = endpoints.len(), "handing endpoints to listener");
        listener.handle(endpoints).await?;
        listeners.push(listener);
    }

    Ok(Runtime { listeners })
}

/// Compile one flow: derive its dependency analysis and bind every node's
/// calls to transport methods and codec managers.
pub fn compile_flow(
    manifest: &Manifest,
    options: &Options,
    flow: &Flow,
) -> Result<FlowManager, ExecutionError> {
    let analysis = planner::analyze(flow)?;

    let index_of: HashMap<&str, usize> = flow
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect();

    let mut nodes = Vec::with_capacity(flow.nodes.len());
    for (index, node) in flow.nodes.iter().enumerate() {
        let deps: Vec<usize> = analysis
            .depends_on
            .get(&node.id)
            .into_iter()
            .flatten()
            .map(|dep| index_of[dep.as_str()])
            .collect();

        let call = node
            .call
            .as_ref()
            .map(|call| compile_call(manifest, options, &node.id, call))
            .transpose()?;
        let rollback = node
            .rollback
            .as_ref()
            .map(|call| compile_call(manifest, options, &node.id, call))
            .transpose()?;

        // The upstream error payload decodes with the called service's
        // codec into the error scope.
        let error_decoder = match (&node.call, effective_error(flow, index)) {
            (Some(call), Some(object)) => {
                let service = manifest
                    .service(&call.service)
                    .ok_or_else(|| unknown_service(flow, &node.id, &call.service))?;
                let codec = lookup_codec(options, &service.codec)?;
                object
                    .response
                    .as_ref()
                    .map(|schema| codec.new_manager(ERROR_RESOURCE, schema))
                    .transpose()
                    .map_err(TransportError::Codec)?
            }
            _ => None,
        };

        nodes.push(CompiledNode {
            id: node.id.clone(),
            index,
            deps,
            call,
            rollback,
            error_decoder,
        });
    }

    let levels: Vec<Vec<usize>> = analysis
        .levels
        .iter()
        .map(|level| level.iter().map(|id| index_of[id.as_str()]).collect())
        .collect();

    Ok(FlowManager::new(
        flow.name.clone(),
        nodes,
        levels,
        options.events.clone(),
        options.rollback_budget,
    ))
}

fn compile_call(
    manifest: &Manifest,
    options: &Options,
    node_id: &str,
    call: &Call,
) -> Result<CompiledCall, ExecutionError> {
    let service = manifest
        .service(&call.service)
        .ok_or_else(|| ManifestError::UnknownService {
            flow: String::new(),
            node: node_id.to_string(),
            service: call.service.clone(),
        })?;

    let caller = options
        .callers
        .get(&service.transport)
        .ok_or_else(|| ManifestError::UnknownTransport {
            service: service.name.clone(),
            transport: service.transport.clone(),
        })?;

    let connection = caller.dial(service, &options.functions, &service.options)?;
    let method = connection
        .method(&call.method)
        .ok_or_else(|| TransportError::UnknownMethod(call.method.clone()))?;

    let codec = lookup_codec(options, &service.codec)?;
    let request = codec
        .new_manager(node_id, &call.request)
        .map_err(TransportError::Codec)?;
    let response = codec
        .new_manager(node_id, &call.response)
        .map_err(TransportError::Codec)?;

    Ok(CompiledCall {
        method,
        request_header: call.request.header.clone(),
        request,
        response,
    })
}

/// Compile the listener-facing dispatcher for one endpoint.
fn compile_endpoint(
    manifest: &Manifest,
    options: &Options,
    manager: Arc<FlowManager>,
    flow: &Flow,
    codec_name: &str,
    endpoint_options: &BTreeMap<String, String>,
) -> Result<EndpointDispatcher, ExecutionError> {
    let codec = lookup_codec(options, codec_name)?;

    let request = codec
        .new_manager(INPUT_RESOURCE, &flow.input)
        .map_err(TransportError::Codec)?;

    let response = flow
        .output
        .body
        .as_ref()
        .map(|_| codec.new_manager("output", &flow.output))
        .transpose()
        .map_err(TransportError::Codec)?;

    let forward = flow
        .forward
        .as_ref()
        .map(|forward| compile_forward(manifest, options, forward))
        .transpose()?;

    let mut node_errors = HashMap::with_capacity(flow.nodes.len());
    for (index, node) in flow.nodes.iter().enumerate() {
        let object = CompiledErrorObject::compile(effective_error(flow, index), codec.as_ref())
            .map_err(TransportError::Codec)?;
        node_errors.insert(node.id.clone(), Arc::new(object));
    }

    let flow_error = Arc::new(
        CompiledErrorObject::compile(flow.on_error.as_ref(), codec.as_ref())
            .map_err(TransportError::Codec)?,
    );

    let deadline = endpoint_options
        .get("deadline")
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs);

    Ok(EndpointDispatcher::new(
        manager,
        request,
        response,
        flow.output.header.clone(),
        forward,
        node_errors,
        flow_error,
        deadline,
        options.events.clone(),
    ))
}

fn compile_forward(
    manifest: &Manifest,
    options: &Options,
    forward: &weir_core::types::Forward,
) -> Result<CompiledForward, ExecutionError> {
    let service = manifest
        .service(&forward.service)
        .ok_or_else(|| ManifestError::UnknownService {
            flow: String::new(),
            node: "forward".to_string(),
            service: forward.service.clone(),
        })?;

    let caller = options
        .callers
        .get(&service.transport)
        .ok_or_else(|| ManifestError::UnknownTransport {
            service: service.name.clone(),
            transport: service.transport.clone(),
        })?;

    let connection = caller.dial(service, &options.functions, &service.options)?;
    let method_name = forward
        .method
        .clone()
        .or_else(|| service.methods.first().map(|method| method.name.clone()))
        .unwrap_or_default();
    let method = connection
        .method(&method_name)
        .ok_or_else(|| TransportError::UnknownMethod(method_name.clone()))?;

    Ok(CompiledForward {
        method,
        header: forward.header.clone(),
    })
}

fn effective_error(flow: &Flow, index: usize) -> Option<&weir_core::types::ErrorObject> {
    flow.nodes[index]
        .on_error
        .as_ref()
        .or(flow.on_error.as_ref())
}

fn lookup_codec<'a>(
    options: &'a Options,
    name: &str,
) -> Result<&'a Arc<dyn Constructor>, ManifestError> {
    options
        .codecs
        .get(name)
        .ok_or_else(|| ManifestError::UnknownCodec(name.to_string()))
}

fn unknown_service(flow: &Flow, node: &str, service: &str) -> ManifestError {
    ManifestError::UnknownService {
        flow: flow.name.clone(),
        node: node.to_string(),
        service: service.to_string(),
    }
}
