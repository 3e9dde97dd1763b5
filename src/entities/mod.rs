pub mod address;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod coupon_usage;
pub mod offer;
pub mod order;
pub mod order_item;
pub mod order_message;
pub mod otp_code;
pub mod product;
pub mod product_variant;
pub mod review;
pub mod testimonial;
pub mod user;
pub mod variant_option;
pub mod variant_option_assignment;
pub mod variant_type;
pub mod wishlist_item;

// Re-export entities
pub use address::{Entity as Address, Model as AddressModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use coupon::{Entity as Coupon, Model as CouponModel};
pub use coupon_usage::{Entity as CouponUsage, Model as CouponUsageModel};
pub use offer::{DiscountType, Entity as Offer, Model as OfferModel, OfferScope};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use order_message::{Entity as OrderMessage, Model as OrderMessageModel};
pub use otp_code::{Entity as OtpCode, Model as OtpCodeModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use testimonial::{Entity as Testimonial, Model as TestimonialModel};
pub use user::{Entity as User, Model as UserModel, UserRole};
pub use variant_option::{Entity as VariantOption, Model as VariantOptionModel};
pub use variant_option_assignment::Entity as VariantOptionAssignment;
pub use variant_type::{Entity as VariantType, Model as VariantTypeModel};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
