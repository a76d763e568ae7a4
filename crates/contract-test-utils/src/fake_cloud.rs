//! In-memory instance provider
//!
//! [`FakeCloud`] answers every [`ResourceClient`] operation with documents
//! laid out like the live provider's, so the bundled fixtures match it.
//! Each `describe` reports an instance's current state and then moves it
//! one step along its scripted transitions.

use async_trait::async_trait;
use contract_harness::{
    ClientError, InstanceState, LaunchParams, NetworkInterfaceSpec, Operation, ResourceClient,
    ResourceHandle, StateAction, Tag,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};

const OWNER_ID: &str = "123456789012";
const AVAILABILITY_ZONE: &str = "us-east-1a";
const VPC_ID: &str = "vpc-1a2b3c4d";

/// One request received by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub ids: Vec<ResourceHandle>,
}

#[derive(Debug, Clone)]
struct FakeInstance {
    reservation_id: String,
    params: LaunchParams,
    state: InstanceState,
    upcoming: VecDeque<InstanceState>,
    tags: Vec<Tag>,
}

impl FakeInstance {
    fn new(params: LaunchParams, state: InstanceState) -> Self {
        Self {
            reservation_id: format!("r-{}", short_id()),
            params,
            state,
            upcoming: VecDeque::new(),
            tags: Vec::new(),
        }
    }

    fn transition(&mut self, now: InstanceState, then: InstanceState) {
        self.state = now;
        self.upcoming = VecDeque::from([then]);
    }

    fn advance(&mut self) {
        if let Some(next) = self.upcoming.pop_front() {
            self.state = next;
        }
    }
}

#[derive(Debug, Default)]
struct CloudState {
    instances: IndexMap<ResourceHandle, FakeInstance>,
    launched: Vec<ResourceHandle>,
    failures: HashMap<Operation, VecDeque<ClientError>>,
    calls: Vec<Call>,
    stalled: bool,
}

impl CloudState {
    fn record(&mut self, operation: Operation, ids: &[ResourceHandle]) -> Result<(), ClientError> {
        self.calls.push(Call {
            operation,
            ids: ids.to_vec(),
        });
        match self.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn instance_mut(
        &mut self,
        operation: Operation,
        id: &ResourceHandle,
    ) -> Result<&mut FakeInstance, ClientError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| not_found(operation, id))
    }
}

/// In-memory stand-in for the instance API
#[derive(Debug)]
pub struct FakeCloud {
    state: Mutex<CloudState>,
    batch_terminate: bool,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCloud {
    /// Empty provider that accepts batch terminations
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CloudState::default()),
            batch_terminate: true,
        }
    }

    /// Provider holding the two long-lived instances the preflight checks expect
    #[must_use]
    pub fn with_known_instances(
        running: impl Into<ResourceHandle>,
        stopped: impl Into<ResourceHandle>,
    ) -> Self {
        Self::new()
            .with_instance(running, InstanceState::Running)
            .with_instance(stopped, InstanceState::Stopped)
    }

    /// Seed an instance in a settled state
    #[must_use]
    pub fn with_instance(self, id: impl Into<ResourceHandle>, state: InstanceState) -> Self {
        let params = LaunchParams::new("ami-3faf9f48", "t1.micro");
        self.state
            .lock()
            .instances
            .insert(id.into(), FakeInstance::new(params, state));
        self
    }

    /// Reject multi-id terminations, forcing one request per handle
    #[must_use]
    pub fn without_batch_terminate(mut self) -> Self {
        self.batch_terminate = false;
        self
    }

    /// Fail the next call of `operation` with `error`
    pub fn fail_next(&self, operation: Operation, error: ClientError) {
        self.state
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Stop every instance from advancing past its current state
    pub fn stall_transitions(&self) {
        self.state.lock().stalled = true;
    }

    /// Replace the states `id` will report on its next describes
    pub fn script(&self, id: &ResourceHandle, states: impl IntoIterator<Item = InstanceState>) {
        if let Some(instance) = self.state.lock().instances.get_mut(id) {
            instance.upcoming = states.into_iter().collect();
        }
    }

    /// Current state of `id`
    #[must_use]
    pub fn state_of(&self, id: &ResourceHandle) -> Option<InstanceState> {
        self.state.lock().instances.get(id).map(|i| i.state.clone())
    }

    /// Tags attached to `id`
    #[must_use]
    pub fn tags_of(&self, id: &ResourceHandle) -> Vec<Tag> {
        self.state
            .lock()
            .instances
            .get(id)
            .map(|i| i.tags.clone())
            .unwrap_or_default()
    }

    /// Every request received, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Requests received for one operation
    #[must_use]
    pub fn calls_for(&self, operation: Operation) -> Vec<Call> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    /// Id lists of every terminate request
    #[must_use]
    pub fn terminate_calls(&self) -> Vec<Vec<ResourceHandle>> {
        self.calls_for(Operation::TerminateInstances)
            .into_iter()
            .map(|c| c.ids)
            .collect()
    }

    /// Ids launched through `create`, in launch order
    #[must_use]
    pub fn launched(&self) -> Vec<ResourceHandle> {
        self.state.lock().launched.clone()
    }
}

#[async_trait]
impl ResourceClient for FakeCloud {
    async fn create(&self, params: &LaunchParams) -> Result<Value, ClientError> {
        let mut state = self.state.lock();
        state.record(Operation::RunInstances, &[])?;

        let id = ResourceHandle::new(format!("i-{}", short_id()));
        let mut instance = FakeInstance::new(params.clone(), InstanceState::Pending);
        instance.transition(InstanceState::Pending, InstanceState::Running);
        let response = reservation_json(&id, &instance);
        state.instances.insert(id.clone(), instance);
        state.launched.push(id.clone());

        tracing::debug!(%id, image = %params.image_id, "fake launch");
        Ok(response)
    }

    async fn describe(&self, ids: &[ResourceHandle]) -> Result<Value, ClientError> {
        let mut state = self.state.lock();
        state.record(Operation::DescribeInstances, ids)?;

        let selected: Vec<ResourceHandle> = if ids.is_empty() {
            state.instances.keys().cloned().collect()
        } else {
            ids.to_vec()
        };

        let stalled = state.stalled;
        let mut reservations = Vec::with_capacity(selected.len());
        for id in &selected {
            let instance = state.instance_mut(Operation::DescribeInstances, id)?;
            reservations.push(reservation_json(id, instance));
            if !stalled {
                instance.advance();
            }
        }
        Ok(json!({ "Reservations": reservations }))
    }

    async fn change_state(
        &self,
        ids: &[ResourceHandle],
        action: StateAction,
    ) -> Result<Value, ClientError> {
        let operation = action.operation();
        let mut state = self.state.lock();
        state.record(operation, ids)?;

        let mut changes = Vec::with_capacity(ids.len());
        for id in ids {
            let instance = state.instance_mut(operation, id)?;
            let previous = instance.state.clone();
            match (action, &previous) {
                (StateAction::Stop, InstanceState::Pending | InstanceState::Running) => {
                    instance.transition(InstanceState::Stopping, InstanceState::Stopped);
                }
                (StateAction::Start, InstanceState::Stopped) => {
                    instance.transition(InstanceState::Pending, InstanceState::Running);
                }
                (_, InstanceState::ShuttingDown | InstanceState::Terminated) => {
                    return Err(ClientError::new(
                        operation,
                        format!("the instance '{id}' is not in a state from which it can be {}", verb(action)),
                    )
                    .with_code("IncorrectInstanceState"));
                }
                _ => {}
            }
            changes.push(state_change_json(id, &previous, &instance.state));
        }

        let key = match action {
            StateAction::Start => "StartingInstances",
            StateAction::Stop => "StoppingInstances",
        };
        let mut body = Map::new();
        body.insert(key.to_string(), Value::Array(changes));
        Ok(Value::Object(body))
    }

    async fn terminate(&self, ids: &[ResourceHandle]) -> Result<Value, ClientError> {
        let operation = Operation::TerminateInstances;
        let mut state = self.state.lock();
        state.record(operation, ids)?;

        if ids.len() > 1 && !self.batch_terminate {
            return Err(ClientError::new(operation, "batch termination is not supported")
                .with_code("Unsupported"));
        }
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(ClientError::new(operation, format!("duplicate instance id '{id}'"))
                    .with_code("InvalidParameterCombination"));
            }
            if !state.instances.contains_key(id) {
                return Err(not_found(operation, id));
            }
        }

        let mut changes = Vec::with_capacity(ids.len());
        for id in ids {
            let instance = state.instance_mut(operation, id)?;
            let previous = instance.state.clone();
            if previous != InstanceState::Terminated {
                instance.transition(InstanceState::ShuttingDown, InstanceState::Terminated);
            }
            changes.push(state_change_json(id, &previous, &instance.state));
        }
        Ok(json!({ "TerminatingInstances": changes }))
    }

    async fn tag(&self, ids: &[ResourceHandle], tags: &[Tag]) -> Result<Value, ClientError> {
        let mut state = self.state.lock();
        state.record(Operation::CreateTags, ids)?;

        for id in ids {
            let instance = state.instance_mut(Operation::CreateTags, id)?;
            for tag in tags {
                instance.tags.retain(|t| t.key != tag.key);
                instance.tags.push(tag.clone());
            }
        }
        Ok(json!({ "RequestId": uuid::Uuid::new_v4().to_string(), "Return": true }))
    }

    async fn password_data(&self, id: &ResourceHandle) -> Result<Value, ClientError> {
        let mut state = self.state.lock();
        state.record(Operation::GetPasswordData, std::slice::from_ref(id))?;
        state.instance_mut(Operation::GetPasswordData, id)?;

        Ok(json!({
            "InstanceId": id.as_str(),
            "Timestamp": "2014-09-05T19:04:37.000Z",
            "PasswordData": "",
        }))
    }

    fn supports_batch_terminate(&self) -> bool {
        self.batch_terminate
    }
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn verb(action: StateAction) -> &'static str {
    match action {
        StateAction::Start => "started",
        StateAction::Stop => "stopped",
    }
}

fn not_found(operation: Operation, id: &ResourceHandle) -> ClientError {
    ClientError::new(operation, format!("the instance id '{id}' does not exist"))
        .with_code("InvalidInstanceID.NotFound")
}

fn state_json(state: &InstanceState) -> Value {
    json!({ "Code": state.code().unwrap_or(0), "Name": state.as_str() })
}

fn state_change_json(id: &ResourceHandle, previous: &InstanceState, current: &InstanceState) -> Value {
    json!({
        "InstanceId": id.as_str(),
        "CurrentState": state_json(current),
        "PreviousState": state_json(previous),
    })
}

fn reservation_json(id: &ResourceHandle, instance: &FakeInstance) -> Value {
    json!({
        "ReservationId": instance.reservation_id,
        "OwnerId": OWNER_ID,
        "Groups": [],
        "Instances": [instance_json(id, instance)],
    })
}

fn instance_json(id: &ResourceHandle, instance: &FakeInstance) -> Value {
    let params = &instance.params;
    let private_ip = "10.0.0.12";
    let mut doc = json!({
        "InstanceId": id.as_str(),
        "ImageId": params.image_id,
        "State": state_json(&instance.state),
        "PrivateDnsName": "ip-10-0-0-12.ec2.internal",
        "PublicDnsName": "",
        "StateTransitionReason": "",
        "InstanceType": params.instance_type,
        "LaunchTime": "2014-09-05T18:58:21.000Z",
        "Placement": { "AvailabilityZone": AVAILABILITY_ZONE, "Tenancy": "default" },
        "Monitoring": { "State": "disabled" },
        "PrivateIpAddress": private_ip,
        "Architecture": "x86_64",
        "RootDeviceType": "ebs",
        "BlockDeviceMappings": [{
            "DeviceName": "/dev/sda1",
            "Ebs": { "VolumeId": "vol-5f3e2c11", "Status": "attached", "DeleteOnTermination": true },
        }],
        "Tags": instance
            .tags
            .iter()
            .map(|t| json!({ "Key": t.key, "Value": t.value }))
            .collect::<Vec<_>>(),
        "SecurityGroups": [{ "GroupName": "default", "GroupId": "sg-9040a2f5" }],
        "Hypervisor": "xen",
    });

    let Some(fields) = doc.as_object_mut() else {
        return doc;
    };
    if instance.state == InstanceState::Running {
        fields.insert("PublicIpAddress".to_string(), json!("54.86.12.7"));
    } else {
        fields.insert(
            "StateReason".to_string(),
            json!({ "Code": instance.state.as_str(), "Message": instance.state.as_str() }),
        );
    }
    if let Some(key_name) = &params.key_name {
        fields.insert("KeyName".to_string(), json!(key_name));
    }
    if let Some(first) = params.network_interfaces.first() {
        fields.insert("SubnetId".to_string(), json!(first.subnet_id));
        fields.insert("VpcId".to_string(), json!(VPC_ID));
        fields.insert(
            "NetworkInterfaces".to_string(),
            Value::Array(
                params
                    .network_interfaces
                    .iter()
                    .map(|spec| interface_json(spec, private_ip))
                    .collect(),
            ),
        );
    }
    doc
}

fn interface_json(spec: &NetworkInterfaceSpec, private_ip: &str) -> Value {
    json!({
        "NetworkInterfaceId": format!("eni-{}", short_id()),
        "SubnetId": spec.subnet_id,
        "VpcId": VPC_ID,
        "Status": "in-use",
        "MacAddress": "0e:5c:1f:7a:33:b1",
        "PrivateIpAddress": private_ip,
        "Groups": spec
            .groups
            .iter()
            .map(|g| json!({ "GroupName": "default", "GroupId": g }))
            .collect::<Vec<_>>(),
        "Attachment": {
            "AttachmentId": format!("eni-attach-{}", short_id()),
            "DeviceIndex": spec.device_index,
            "Status": "attaching",
            "DeleteOnTermination": true,
        },
    })
}
