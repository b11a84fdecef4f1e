use actix_web::web;

use crate::web::handlers::{
  address_handlers, admin_handlers, auth_handlers, cart_handlers, checkout_handlers, consultation_handlers,
  order_handlers, product_handlers, promotion_handlers, qa_handlers,
};

/// Registers every route of the storefront. Called from `main` and from the integration tests.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/health", web::get().to(consultation_handlers::health_check_handler))
    // Guest and user cart
    .service(
      web::scope("/cart")
        .route("/add", web::post().to(cart_handlers::add_to_cart_handler))
        .route("/update", web::put().to(cart_handlers::update_cart_handler))
        .route("/remove/{product_id}", web::delete().to(cart_handlers::remove_from_cart_handler))
        .route("/clear", web::delete().to(cart_handlers::clear_cart_handler))
        .route("/api/items", web::get().to(cart_handlers::cart_items_handler)),
    )
    // Q&A publish and topics
    .route("/product/qa", web::post().to(qa_handlers::publish_question_handler))
    .service(
      web::scope("/topic/product/{product_id}")
        .route("/qa", web::get().to(qa_handlers::subscribe_questions_handler))
        .route("/qa/like", web::get().to(qa_handlers::subscribe_likes_handler)),
    )
    // Back-office pages share the order detail endpoint
    .service(web::scope("/admin").route("/orders/{order_id}", web::get().to(admin_handlers::get_order_handler)))
    .service(
      web::scope("/api")
        .route("/health", web::get().to(consultation_handlers::health_check_handler))
        .route("/consultation", web::post().to(consultation_handlers::consultation_handler))
        .route("/forgot-password", web::post().to(auth_handlers::forgot_password_handler))
        .service(
          web::scope("/auth")
            .route("/signup", web::post().to(auth_handlers::signup_handler))
            .route("/signin", web::post().to(auth_handlers::signin_handler))
            .route("/signout", web::post().to(auth_handlers::signout_handler))
            .route("/me", web::get().to(auth_handlers::me_handler))
            .route(
              "/password-reset/request",
              web::post().to(auth_handlers::password_reset_request_handler),
            )
            .route(
              "/password-reset/confirm",
              web::post().to(auth_handlers::password_reset_confirm_handler),
            ),
        )
        .route("/categories", web::get().to(product_handlers::list_categories_handler))
        .service(
          web::scope("/products")
            .route("", web::get().to(product_handlers::list_products_handler))
            .route("/qa/{question_id}/replies", web::get().to(qa_handlers::list_replies_handler))
            .route("/qa/{qa_id}/like", web::get().to(qa_handlers::toggle_like_handler))
            .route("/qa/{qa_id}/hasLiked", web::get().to(qa_handlers::has_liked_handler))
            .route("/{product_id}/qa", web::get().to(qa_handlers::list_questions_handler))
            .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
        )
        .service(
          web::scope("/cart")
            .route("/sync", web::get().to(cart_handlers::cart_sync_handler))
            .route("/weights", web::post().to(cart_handlers::cart_weights_handler))
            .route("/checkout-ready", web::get().to(cart_handlers::checkout_ready_handler)),
        )
        .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
        .service(
          web::scope("/orders")
            .route("", web::get().to(order_handlers::list_orders_handler))
            .route("/track/{order_number}", web::get().to(order_handlers::track_order_handler))
            .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
            .route("/{order_id}/cancel", web::post().to(order_handlers::cancel_order_handler)),
        )
        .route("/promotions/validate", web::post().to(promotion_handlers::validate_promotion_handler))
        .service(
          web::scope("/addresses")
            .route("", web::get().to(address_handlers::list_addresses_handler))
            .route("", web::post().to(address_handlers::create_address_handler))
            .route("/{address_id}", web::get().to(address_handlers::get_address_handler))
            .route("/{address_id}", web::put().to(address_handlers::update_address_handler))
            .route("/{address_id}", web::delete().to(address_handlers::delete_address_handler))
            .route(
              "/{address_id}/set-default",
              web::post().to(address_handlers::set_default_address_handler),
            ),
        )
        .service(
          web::scope("/admin")
            .route("/orders", web::get().to(admin_handlers::list_orders_handler))
            .route("/orders/{order_id}", web::get().to(admin_handlers::get_order_handler))
            .route("/orders/{order_id}", web::put().to(admin_handlers::update_order_handler))
            .route("/orders/{order_id}/status", web::put().to(admin_handlers::change_status_handler))
            .route("/orders/{order_id}/approve-cod", web::post().to(admin_handlers::approve_cod_handler))
            .route("/users", web::get().to(admin_handlers::list_users_handler))
            .route("/users", web::post().to(admin_handlers::create_user_handler))
            .route("/users/{user_id}", web::get().to(admin_handlers::get_user_handler))
            .route("/users/{user_id}", web::put().to(admin_handlers::update_user_handler))
            .route("/users/{user_id}", web::delete().to(admin_handlers::delete_user_handler))
            .route("/promotions", web::get().to(promotion_handlers::list_promotions_handler))
            .route("/promotions", web::post().to(promotion_handlers::create_promotion_handler))
            .route("/promotions/{promotion_id}", web::put().to(promotion_handlers::update_promotion_handler))
            .route("/promotions/{promotion_id}", web::delete().to(promotion_handlers::delete_promotion_handler))
            .route("/products/{product_id}", web::delete().to(product_handlers::delete_product_handler))
            .route("/qa/{qa_id}/answer", web::post().to(qa_handlers::answer_question_handler))
            .route("/qa/{qa_id}/visibility", web::put().to(qa_handlers::set_visibility_handler)),
        ),
    );
}
