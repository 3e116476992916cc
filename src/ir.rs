use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowDocument {
    pub metadata: Metadata,
    pub actors: Vec<Actor>,
    pub phases: Vec<Phase>,
    pub tasks: Vec<Task>,
    pub gateways: Vec<Gateway>,
    pub flows: Vec<Flow>,
    /// Open questions recorded while the document was drafted.
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub id: String,
    pub title: String,
    pub source: String,
    pub last_updated: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            id: "flow".to_string(),
            title: "Business Process".to_string(),
            source: String::new(),
            last_updated: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    System,
    /// Also any unrecognized type.
    #[default]
    #[serde(other)]
    Human,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Actor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActorKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Phase {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub actor_id: String,
    pub phase_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Parallel,
    Inclusive,
    /// Also any unrecognized type.
    #[default]
    #[serde(other)]
    Exclusive,
}

impl GatewayKind {
    pub fn bpmn_element(self) -> &'static str {
        match self {
            Self::Exclusive => "exclusiveGateway",
            Self::Parallel => "parallelGateway",
            Self::Inclusive => "inclusiveGateway",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gateway {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: GatewayKind,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Flow {
    pub id: String,
    pub from: String,
    pub to: String,
    pub condition: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub id: String,
    #[serde(alias = "description")]
    pub note: String,
    pub severity: Option<String>,
}

impl FlowDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.gateways.is_empty()
    }

    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.id == id)
    }

    pub fn add_actor(&mut self, id: &str, name: &str) {
        self.actors.push(Actor {
            id: id.to_string(),
            name: name.to_string(),
            kind: ActorKind::Human,
        });
    }

    pub fn add_phase(&mut self, id: &str, name: &str) {
        self.phases.push(Phase {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn add_task(&mut self, id: &str, name: &str, actor_id: &str, phase_id: Option<&str>) {
        self.tasks.push(Task {
            id: id.to_string(),
            name: name.to_string(),
            actor_id: actor_id.to_string(),
            phase_id: phase_id.map(str::to_string),
            notes: None,
        });
    }

    pub fn add_gateway(&mut self, id: &str, name: &str, kind: GatewayKind) {
        self.gateways.push(Gateway {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            notes: None,
        });
    }

    pub fn add_flow(&mut self, from: &str, to: &str, condition: Option<&str>) {
        let id = format!("flow_{}", self.flows.len() + 1);
        self.flows.push(Flow {
            id,
            from: from.to_string(),
            to: to.to_string(),
            condition: condition.map(str::to_string),
            name: None,
        });
    }

    pub fn add_issue(&mut self, note: &str) {
        let id = format!("issue_{}", self.issues.len() + 1);
        self.issues.push(Issue {
            id,
            note: note.to_string(),
            severity: None,
        });
    }
}
