pub mod attendance;
pub mod event;
pub mod post;
pub mod subscription;
pub mod user;

pub use attendance::{Attendance, AttendanceResponse, Attendee};
pub use event::{Event, EventDraft, RespondedEvent};
pub use post::{Post, PostType};
pub use subscription::Subscription;
pub use user::{PublicUser, User, UserProfile};
