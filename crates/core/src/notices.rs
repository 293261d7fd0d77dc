//! Texts shown to operators.

pub const RENEW_PROMPT: &str = "Renew required, use `answer` to resolve it";
pub const RESUME_PROMPT: &str = "Answer the challenge below using `answer`";
pub const RETRY_PROMPT: &str = "Incorrect";
pub const SOLVED: &str = ":thumbsup:";
pub const SUPERSEDED: &str = "Someone renewed with the website.";
pub const EXPIRED: &str = "The server expired.\nDo `resume` to resume it.";
pub const QUEUE_CLEARED: &str = "Position 0";
pub const STARTED: &str = "The server has started, it'll be ready in a minute.";
pub const RENEWED_ANNOUNCEMENT: &str = "say Renewed";

pub const ALREADY_RESUMED: &str = "The service is already resumed.";
pub const RESUMING: &str = "Resuming the server.";
pub const NOT_AWAITING_ANSWER: &str = "Renew not required";
pub const ANSWER_LENGTH: &str = "Answers are 4 to 6 characters long.";
pub const ANSWER_RECEIVED: &str = "We will see...";
pub const RENEWING: &str = "Renewing underway.";
pub const OWNER_ONLY: &str = "Only the owner can do that.";
pub const SHUTTING_DOWN: &str = "Adios";

pub const ONLINE_ACTIVITY: &str = "server online";
pub const WAITING_ACTIVITY: &str = "waiting for resume";
pub const QUEUE_ACTIVITY: &str = "in queue";
