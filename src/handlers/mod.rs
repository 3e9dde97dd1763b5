pub mod addresses;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod common;
pub mod coupons;
pub mod offers;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod testimonials;
pub mod wishlist;

use crate::services::{
    AddressService, CartService, CatalogService, CategoryService, CouponService, MessageService,
    OfferService, OrderService, ReviewService, TestimonialService, WishlistService,
};

/// All domain services, wired once at startup and shared through [`crate::AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub categories: CategoryService,
    pub catalog: CatalogService,
    pub offers: OfferService,
    pub coupons: CouponService,
    pub cart: CartService,
    pub orders: OrderService,
    pub wishlist: WishlistService,
    pub addresses: AddressService,
    pub reviews: ReviewService,
    pub testimonials: TestimonialService,
    pub messages: MessageService,
    pub otp: crate::auth::OtpService,
}
