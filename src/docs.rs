use crate::api::attendances::{
    AttendanceDetail, AttendanceListResponse, AttendanceQuery, AttendanceSummary,
    CompleteAttendance, CreateAttendance, UpdateAttendance,
};
use crate::api::clients::{ClientListResponse, ClientQuery, CreateClient};
use crate::api::forms::{
    CreateForm, FieldInput, FormDetail, FormListResponse, FormQuery, FormSummary,
};
use crate::api::notifications::{NotificationListResponse, NotificationQuery};
use crate::api::nps::{NpsListResponse, NpsQuery, NpsRow, NpsSummary, SubmitSurvey};
use crate::api::users::{ChangePassword, CreateUser, UserListResponse, UserQuery};
use crate::auth::handlers::{LoginResponse, LoginUser};
use crate::form_engine::{FieldError, FieldType};
use crate::model::attendance::Attendance;
use crate::model::attendance_form::AttendanceForm;
use crate::model::client::Client;
use crate::model::form_field::FormFieldRow;
use crate::model::notification::Notification;
use crate::model::nps::NpsSurvey;
use crate::model::user::UserRow;
use crate::models::LoginReqDto;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fiber Beauty API",
        version = "1.0.0",
        description = r#"
## Fiber Beauty — Salon Administration API

This API powers the **Fiber Beauty** back office: client records, configurable
attendance forms, service attendances and post-service NPS ratings for a
beauty salon.

### 🔹 Key Features
- **Client Management**
  - Register, update, list and deactivate clients (CPF-validated)
- **Attendance Forms**
  - Build forms from typed fields (text, number, date, select, radio, checkbox)
- **Attendances**
  - Open a record for a client, collect answers, finish with a signature
- **NPS Ratings**
  - Every completed attendance gets a survey link; clients rate 0–10
- **Notifications**
  - In-app inbox with unread counters

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Administrative operations require the **ADMIN** role; day-to-day salon work
runs under **ATTENDANT**. Survey endpoints are public but token-addressed.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

### 🚀 Usage
Use this API to build:
- Salon reception dashboards
- Tablet intake forms with signature capture
- NPS follow-up flows

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::users::create_user,
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::change_password,
        crate::api::users::delete_user,

        crate::api::clients::create_client,
        crate::api::clients::list_clients,
        crate::api::clients::get_client,
        crate::api::clients::update_client,
        crate::api::clients::delete_client,

        crate::api::forms::create_form,
        crate::api::forms::list_forms,
        crate::api::forms::get_form,
        crate::api::forms::update_form,
        crate::api::forms::delete_form,

        crate::api::attendances::create_attendance,
        crate::api::attendances::list_attendances,
        crate::api::attendances::get_attendance,
        crate::api::attendances::update_attendance,
        crate::api::attendances::complete_attendance,
        crate::api::attendances::cancel_attendance,
        crate::api::attendances::delete_attendance,

        crate::api::notifications::list_notifications,
        crate::api::notifications::unread_count,
        crate::api::notifications::mark_read,
        crate::api::notifications::mark_all_read,

        crate::api::nps::get_survey,
        crate::api::nps::submit_survey,
        crate::api::nps::list_surveys,
        crate::api::nps::nps_summary
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            LoginUser,
            UserRow,
            CreateUser,
            UserQuery,
            UserListResponse,
            ChangePassword,
            Client,
            CreateClient,
            ClientQuery,
            ClientListResponse,
            AttendanceForm,
            FormFieldRow,
            FieldType,
            FieldError,
            FieldInput,
            CreateForm,
            FormQuery,
            FormSummary,
            FormListResponse,
            FormDetail,
            Attendance,
            CreateAttendance,
            UpdateAttendance,
            CompleteAttendance,
            AttendanceQuery,
            AttendanceSummary,
            AttendanceListResponse,
            AttendanceDetail,
            Notification,
            NotificationQuery,
            NotificationListResponse,
            NpsSurvey,
            SubmitSurvey,
            NpsQuery,
            NpsRow,
            NpsListResponse,
            NpsSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and logout"),
        (name = "Users", description = "Salon staff accounts (admin)"),
        (name = "Clients", description = "Client registry APIs"),
        (name = "Forms", description = "Attendance form builder APIs"),
        (name = "Attendances", description = "Service attendance APIs"),
        (name = "Notifications", description = "In-app notification APIs"),
        (name = "NPS", description = "Post-service rating APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
