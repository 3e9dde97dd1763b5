pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod categories;
pub mod coupons;
pub mod messages;
pub mod offers;
pub mod orders;
pub mod reviews;
pub mod testimonials;
pub mod wishlist;

pub use addresses::AddressService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use categories::CategoryService;
pub use coupons::CouponService;
pub use messages::MessageService;
pub use offers::OfferService;
pub use orders::OrderService;
pub use reviews::ReviewService;
pub use testimonials::TestimonialService;
pub use wishlist::WishlistService;
