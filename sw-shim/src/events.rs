//! Service Worker Events
//!
//! Event kinds delivered by the platform and the payloads forwarded to the
//! processing module.

use core::fmt;

/// Control token a page posts to ask a waiting worker to take over.
pub const SKIP_WAITING: &str = "SKIP_WAITING";

/// Event kind, named after the platform event it mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `install`
    Install,
    /// `activate`
    Activate,
    /// `fetch`
    Fetch,
    /// `push`
    Push,
    /// `pushsubscriptionchange`
    PushSubscriptionChange,
    /// `notificationclick`
    NotificationClick,
    /// `message`
    Message,
}

impl EventKind {
    /// All kinds, in listener registration order.
    pub const ALL: [EventKind; 7] = [
        EventKind::Install,
        EventKind::Activate,
        EventKind::Fetch,
        EventKind::Push,
        EventKind::PushSubscriptionChange,
        EventKind::NotificationClick,
        EventKind::Message,
    ];

    /// Event name as fixed by the host environment.
    pub fn platform_name(&self) -> &'static str {
        match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Push => "push",
            EventKind::PushSubscriptionChange => "pushsubscriptionchange",
            EventKind::NotificationClick => "notificationclick",
            EventKind::Message => "message",
        }
    }

    pub fn from_platform_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.platform_name() == name)
    }

    /// Whether this is a lifecycle event (failure rejects the event).
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, EventKind::Install | EventKind::Activate)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform_name())
    }
}

/// Intercepted network request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEvent {
    method: String,
    url: String,
}

impl FetchEvent {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path component of the request URL (`/app/index.html`).
    pub fn path(&self) -> &str {
        let rest = match self.url.split_once("://") {
            Some((_, rest)) => match rest.find('/') {
                Some(pos) => &rest[pos..],
                None => "/",
            },
            None => self.url.as_str(),
        };
        rest.split(&['?', '#'][..]).next().unwrap_or(rest)
    }
}

/// Response produced by the processing module for a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// What the host should do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Answer with this response.
    Respond(FetchResponse),
    /// Don't intercept; let the platform perform its default handling.
    Fallthrough,
}

/// Push event data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PushEvent {
    data: Option<Vec<u8>>,
}

impl PushEvent {
    pub fn new(data: Option<Vec<u8>>) -> Self {
        Self { data }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(Some(text.as_bytes().to_vec()))
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Payload as UTF-8 text, if any
    pub fn text(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| core::str::from_utf8(d).ok().map(|s| s.to_string()))
    }
}

/// Push subscription expired or was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PushSubscriptionChangeEvent {
    old_endpoint: Option<String>,
    new_endpoint: Option<String>,
}

impl PushSubscriptionChangeEvent {
    pub fn new(old_endpoint: Option<String>) -> Self {
        Self {
            old_endpoint,
            new_endpoint: None,
        }
    }

    pub fn old_endpoint(&self) -> Option<&str> {
        self.old_endpoint.as_deref()
    }

    /// Endpoint obtained by the renewer, set before the module sees the event.
    pub fn new_endpoint(&self) -> Option<&str> {
        self.new_endpoint.as_deref()
    }

    pub(crate) fn set_new_endpoint(&mut self, endpoint: String) {
        self.new_endpoint = Some(endpoint);
    }
}

/// Notification click event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationClickEvent {
    tag: Option<String>,
    action: Option<String>,
    data: Option<Vec<u8>>,
}

impl NotificationClickEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Data attached to the notification when it was shown
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

/// Message posted to the worker by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    data: Vec<u8>,
    origin: String,
    source: Option<String>,
}

impl MessageEvent {
    pub fn new(data: impl Into<Vec<u8>>, origin: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            origin: origin.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Client that posted the message
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        core::str::from_utf8(&self.data).ok()
    }

    /// The control token carried by this message, if it is one.
    pub fn control(&self) -> Option<ControlMessage> {
        ControlMessage::parse(&self.data)
    }
}

/// Messages the controlling page may send to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Stop waiting and take over now.
    SkipWaiting,
}

impl ControlMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMessage::SkipWaiting => SKIP_WAITING,
        }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        (data == SKIP_WAITING.as_bytes()).then_some(ControlMessage::SkipWaiting)
    }

    /// Wrap as a message event, as the page would post it.
    pub fn to_event(&self, origin: impl Into<String>) -> MessageEvent {
        MessageEvent::new(self.as_str().as_bytes().to_vec(), origin)
    }
}

/// A platform event with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(FetchEvent),
    Push(PushEvent),
    PushSubscriptionChange(PushSubscriptionChangeEvent),
    NotificationClick(NotificationClickEvent),
    Message(MessageEvent),
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkerEvent::Install => EventKind::Install,
            WorkerEvent::Activate => EventKind::Activate,
            WorkerEvent::Fetch(_) => EventKind::Fetch,
            WorkerEvent::Push(_) => EventKind::Push,
            WorkerEvent::PushSubscriptionChange(_) => EventKind::PushSubscriptionChange,
            WorkerEvent::NotificationClick(_) => EventKind::NotificationClick,
            WorkerEvent::Message(_) => EventKind::Message,
        }
    }
}
