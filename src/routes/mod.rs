use actix_web::web;

pub mod admin;
pub mod member;
pub mod public;

/// The whole JSON surface in one table. Paths shared by several methods
/// live in a single resource so dispatch stays unambiguous; the handlers
/// themselves are grouped by audience in the submodules.
pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/is_server_active", web::get().to(public::is_server_active))
            // Sessions and accounts
            .route("/auth/login", web::post().to(public::handle_login))
            .route("/auth/logout", web::post().to(public::handle_logout))
            .route("/auth/me", web::get().to(public::whoami))
            .route("/auth/register", web::post().to(admin::register_account))
            .route("/accounts", web::get().to(admin::list_accounts))
            .route("/accounts/{id}", web::put().to(admin::update_account))
            // Announcements
            .service(
                web::resource("/announcements")
                    .route(web::get().to(public::list_announcements))
                    .route(web::post().to(admin::create_announcement)),
            )
            .service(
                web::resource("/announcements/{id}")
                    .route(web::put().to(admin::update_announcement))
                    .route(web::delete().to(admin::delete_announcement)),
            )
            // Blog
            .service(
                web::resource("/blog")
                    .route(web::get().to(public::get_blog))
                    .route(web::post().to(member::submit_blog_post))
                    .route(web::patch().to(admin::set_post_published)),
            )
            // Service hours
            .service(
                web::resource("/service-hours")
                    .route(web::get().to(member::list_service_hours))
                    .route(web::post().to(member::submit_service_hours)),
            )
            .route(
                "/service-hours/leaderboard",
                web::get().to(member::leaderboard),
            )
            .route(
                "/service-hours/{id}/approve",
                web::put().to(admin::review_service_hours),
            )
            // Project suggestions
            .service(
                web::resource("/suggestions")
                    .route(web::get().to(admin::list_suggestions))
                    .route(web::post().to(member::submit_suggestion))
                    .route(web::patch().to(admin::review_suggestion)),
            )
            .route("/suggestions/{id}", web::delete().to(admin::delete_suggestion))
            // Membership applications
            .service(
                web::resource("/membership-applications")
                    .route(web::post().to(public::submit_membership_application))
                    .route(web::get().to(admin::list_applications)),
            )
            // Events, RSVPs and attendance
            .service(
                web::resource("/events")
                    .route(web::get().to(member::list_events))
                    .route(web::post().to(admin::create_event)),
            )
            .service(
                web::resource("/events/{id}")
                    .route(web::get().to(member::get_event))
                    .route(web::put().to(admin::update_event))
                    .route(web::delete().to(admin::delete_event)),
            )
            .route("/events/{id}/rsvp", web::post().to(member::rsvp_to_event))
            .service(
                web::resource("/events/{id}/attendance")
                    .route(web::get().to(member::event_attendance))
                    .route(web::post().to(member::mark_attendance)),
            )
            // Intake queues
            .service(
                web::resource("/contact")
                    .route(web::post().to(public::submit_contact_message))
                    .route(web::get().to(admin::list_contact_messages)),
            )
            .service(
                web::resource("/payments")
                    .route(web::post().to(public::submit_payment))
                    .route(web::get().to(admin::list_payments)),
            )
            // Dashboard rollups
            .route("/admin/stats", web::get().to(admin::club_stats)),
    );
}
