use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SocketError;

/// Room subscription events a dashboard client may emit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomEvent {
    JoinOrganization(String),
    LeaveOrganization(String),
    JoinAppointment(String),
    LeaveAppointment(String),
    JoinPublic,
}

/// Room identity used to track active subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    Organization(String),
    Appointment(String),
    Public,
}

#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

impl RoomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::JoinOrganization(_) => "join:organization",
            RoomEvent::LeaveOrganization(_) => "leave:organization",
            RoomEvent::JoinAppointment(_) => "join:appointment",
            RoomEvent::LeaveAppointment(_) => "leave:appointment",
            RoomEvent::JoinPublic => "join:public",
        }
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            RoomEvent::JoinOrganization(id)
            | RoomEvent::LeaveOrganization(id)
            | RoomEvent::JoinAppointment(id)
            | RoomEvent::LeaveAppointment(id) => Some(id),
            RoomEvent::JoinPublic => None,
        }
    }

    pub fn room(&self) -> Room {
        match self {
            RoomEvent::JoinOrganization(id) | RoomEvent::LeaveOrganization(id) => Room::Organization(id.clone()),
            RoomEvent::JoinAppointment(id) | RoomEvent::LeaveAppointment(id) => Room::Appointment(id.clone()),
            RoomEvent::JoinPublic => Room::Public,
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(
            self,
            RoomEvent::JoinOrganization(_) | RoomEvent::JoinAppointment(_) | RoomEvent::JoinPublic
        )
    }

    /// Build an event from its wire name and optional id, e.g. from CLI input.
    pub fn parse(name: &str, id: Option<&str>) -> Result<Self, SocketError> {
        let require = |id: Option<&str>| {
            id.map(str::to_string)
                .ok_or_else(|| SocketError::InvalidEvent(format!("'{}' requires an id", name)))
        };

        match name {
            "join:organization" => Ok(RoomEvent::JoinOrganization(require(id)?)),
            "leave:organization" => Ok(RoomEvent::LeaveOrganization(require(id)?)),
            "join:appointment" => Ok(RoomEvent::JoinAppointment(require(id)?)),
            "leave:appointment" => Ok(RoomEvent::LeaveAppointment(require(id)?)),
            "join:public" => Ok(RoomEvent::JoinPublic),
            other => Err(SocketError::InvalidEvent(format!("unknown event '{}'", other))),
        }
    }

    pub fn to_frame(&self) -> Result<String, SocketError> {
        let frame = Frame {
            event: self.name().to_string(),
            data: self.payload().map(|id| Value::String(id.to_string())).unwrap_or(Value::Null),
        };
        Ok(serde_json::to_string(&frame)?)
    }
}

/// An event pushed by the server, e.g. `appointment:updated`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEvent {
    pub event: String,
    pub data: Value,
}

impl ServerEvent {
    pub fn from_frame(raw: &str) -> Result<Self, SocketError> {
        let frame: Frame = serde_json::from_str(raw)?;
        Ok(Self { event: frame.event, data: frame.data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_carry_name_and_id() {
        let frame = RoomEvent::JoinAppointment("apt_42".into()).to_frame().unwrap();
        assert_eq!(frame, r#"{"event":"join:appointment","data":"apt_42"}"#);

        let frame = RoomEvent::JoinPublic.to_frame().unwrap();
        assert_eq!(frame, r#"{"event":"join:public","data":null}"#);
    }

    #[test]
    fn join_and_leave_share_a_room() {
        let join = RoomEvent::JoinOrganization("org_1".into());
        let leave = RoomEvent::LeaveOrganization("org_1".into());
        assert_eq!(join.room(), leave.room());
        assert!(join.is_join());
        assert!(!leave.is_join());
    }

    #[test]
    fn parse_requires_ids_where_needed() {
        assert_eq!(RoomEvent::parse("join:public", None).unwrap(), RoomEvent::JoinPublic);
        assert!(RoomEvent::parse("join:organization", None).is_err());
        assert!(RoomEvent::parse("join:everything", Some("x")).is_err());
    }

    #[test]
    fn server_frames_parse() {
        let event = ServerEvent::from_frame(r#"{"event":"appointment:updated","data":{"id":"a1"}}"#).unwrap();
        assert_eq!(event.event, "appointment:updated");
        assert_eq!(event.data["id"], "a1");
        assert!(ServerEvent::from_frame("not json").is_err());
    }
}
