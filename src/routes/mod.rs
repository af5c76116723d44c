pub mod auth;
pub mod categories;
pub mod health;
pub mod todos;
pub mod users;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::login)
            .service(auth::logout)
            .service(auth::me)
            .service(auth::change_password),
    )
    .service(
        web::scope("/users")
            .service(users::get_profile)
            .service(users::update_profile)
            .service(users::update_preferences)
            .service(users::deactivate_account)
            .service(users::delete_account)
            .service(users::get_stats),
    )
    .service(
        web::scope("/todos")
            .service(todos::bulk_delete_todos)
            .service(todos::list_todos)
            .service(todos::create_todo)
            .service(todos::get_todo)
            .service(todos::update_todo)
            .service(todos::update_todo_status)
            .service(todos::delete_todo),
    )
    .service(
        // `/stats` is registered before `/{id}` so it is not swallowed by
        // the id matcher.
        web::scope("/categories")
            .service(categories::get_stats)
            .service(categories::list_categories)
            .service(categories::create_category)
            .service(categories::get_category)
            .service(categories::update_category)
            .service(categories::delete_category),
    );
}
