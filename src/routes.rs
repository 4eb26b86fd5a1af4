use crate::{
    api::{attendances, clients, forms, notifications, nps, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(build_limiter(config.rate_refresh_per_min))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Public survey routes, token-addressed so no auth
    cfg.service(
        web::scope("/survey").service(
            web::resource("/{token}")
                .wrap(build_limiter(config.rate_survey_per_min))
                .route(web::get().to(nps::get_survey))
                .route(web::post().to(nps::submit_survey)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
             // authentication
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(handlers::me)
            .service(
                web::scope("/users")
                    // /users
                    .service(
                        web::resource("")
                            .route(web::post().to(users::create_user))
                            .route(web::get().to(users::list_users)),
                    )
                    // /users/{id}/password
                    .service(
                        web::resource("/{id}/password")
                            .route(web::put().to(users::change_password)),
                    )
                    // /users/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(users::get_user))
                            .route(web::put().to(users::update_user))
                            .route(web::delete().to(users::delete_user)),
                    ),
            )
            .service(
                web::scope("/clients")
                    // /clients
                    .service(
                        web::resource("")
                            .route(web::post().to(clients::create_client))
                            .route(web::get().to(clients::list_clients)),
                    )
                    // /clients/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(clients::get_client))
                            .route(web::put().to(clients::update_client))
                            .route(web::delete().to(clients::delete_client)),
                    ),
            )
            .service(
                web::scope("/forms")
                    // /forms
                    .service(
                        web::resource("")
                            .route(web::post().to(forms::create_form))
                            .route(web::get().to(forms::list_forms)),
                    )
                    // /forms/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(forms::get_form))
                            .route(web::put().to(forms::update_form))
                            .route(web::delete().to(forms::delete_form)),
                    ),
            )
            .service(
                web::scope("/attendances")
                    // /attendances
                    .service(
                        web::resource("")
                            .route(web::post().to(attendances::create_attendance))
                            .route(web::get().to(attendances::list_attendances)),
                    )
                    // /attendances/{id}/complete
                    .service(
                        web::resource("/{id}/complete")
                            .route(web::put().to(attendances::complete_attendance)),
                    )
                    // /attendances/{id}/cancel
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(attendances::cancel_attendance)),
                    )
                    // /attendances/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(attendances::get_attendance))
                            .route(web::put().to(attendances::update_attendance))
                            .route(web::delete().to(attendances::delete_attendance)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    // /notifications
                    .service(
                        web::resource("").route(web::get().to(notifications::list_notifications)),
                    )
                    // /notifications/unread-count
                    .service(
                        web::resource("/unread-count")
                            .route(web::get().to(notifications::unread_count)),
                    )
                    // /notifications/read-all
                    .service(
                        web::resource("/read-all")
                            .route(web::put().to(notifications::mark_all_read)),
                    )
                    // /notifications/{id}/read
                    .service(
                        web::resource("/{id}/read").route(web::put().to(notifications::mark_read)),
                    ),
            )
            .service(
                web::scope("/nps")
                    // /nps/summary
                    .service(web::resource("/summary").route(web::get().to(nps::nps_summary)))
                    // /nps
                    .service(web::resource("").route(web::get().to(nps::list_surveys))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token

// ATTENDANCE
//  ├─ open ──(complete: signature)──▶ completed ──▶ nps survey token
//  └─ open ──(cancel)──▶ canceled
