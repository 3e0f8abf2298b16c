// Connection defaults
pub const DEFAULT_SERVER_URL: &str = "https://ai-chat-api-syss.onrender.com";
pub const SOCKET_IO_PATH: &str = "/socket.io/";
pub const ENGINE_IO_VERSION: &str = "4";
pub const DEFAULT_NAMESPACE: &str = "/";

// Event names shared with the backend
pub const MESSAGE_EVENT: &str = "message";
pub const BOT_RESPONSE_EVENT: &str = "botResponse";

// Timing
pub const DEFAULT_TYPING_SPEED_MS: u64 = 30;
// 0 keeps retrying until the user quits.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 0;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_RECONNECT_DELAY_MS: u64 = 5000;
pub const CONNECT_TIMEOUT_MS: u64 = 20_000;
pub const SHUTDOWN_TIMEOUT_MS: u64 = 2000;
pub const MAX_HEARTBEAT_MS: u64 = 60 * 60 * 1000;
pub const MAX_PENDING_EMITS: usize = 64;
pub const RENDER_TICK_MS: u64 = 250;
pub const INPUT_POLL_MS: u64 = 100;

// UI
pub const MAX_LOG_ENTRIES: usize = 200;
pub const APP_NAME: &str = "chatline";
