//! Well-known event names shared between widgets and services.

// System
pub const APP_INIT: &str = "app:init";
pub const APP_READY: &str = "app:ready";
pub const APP_ERROR: &str = "app:error";

// User
pub const USER_LOGIN: &str = "user:login";
pub const USER_LOGOUT: &str = "user:logout";
pub const USER_AUTH_CHANGED: &str = "user:auth:changed";

// Chat
pub const CHAT_MESSAGE_SENT: &str = "chat:message:sent";
pub const CHAT_MESSAGE_RECEIVED: &str = "chat:message:received";
pub const CHAT_MODE_CHANGED: &str = "chat:mode:changed";
pub const CHAT_CONVERSATION_CLEARED: &str = "chat:conversation:cleared";
pub const CHAT_CONNECTION_CHANGED: &str = "chat:connection:changed";

// Admin
pub const ADMIN_LOGIN: &str = "admin:login";
pub const ADMIN_LOGOUT: &str = "admin:logout";
pub const ADMIN_BACKUP_CREATED: &str = "admin:backup:created";
pub const ADMIN_BACKUP_RESTORED: &str = "admin:backup:restored";

// UI
pub const UI_THEME_CHANGED: &str = "ui:theme:changed";
pub const UI_MODAL_OPENED: &str = "ui:modal:opened";
pub const UI_MODAL_CLOSED: &str = "ui:modal:closed";
pub const UI_NOTIFICATION_ADDED: &str = "ui:notification:added";
pub const UI_NOTIFICATION_REMOVED: &str = "ui:notification:removed";

// Network
pub const NETWORK_ONLINE: &str = "network:online";
pub const NETWORK_OFFLINE: &str = "network:offline";
pub const NETWORK_ERROR: &str = "network:error";

// Component lifecycle
pub const COMPONENT_MOUNTED: &str = "component:mounted";
pub const COMPONENT_DESTROYED: &str = "component:destroyed";
pub const COMPONENT_ERROR: &str = "component:error";
