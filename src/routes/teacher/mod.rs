mod handler;
mod model;

pub use handler::{check_token, login};
pub use model::{CheckTokenResponse, TeacherLoginRequest, TeacherLoginResponse};
