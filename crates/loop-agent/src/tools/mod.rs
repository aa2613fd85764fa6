//! The customer-service tools and the user store they share.

mod get_user_details;
mod notify_customer;
mod search_users;
mod store;
mod update_subscription;

pub use get_user_details::{GetUserDetailsParameters, GetUserDetailsTool};
pub use notify_customer::{NotifyCustomerParameters, NotifyCustomerTool};
pub use search_users::{SearchUsersParameters, SearchUsersTool};
pub use store::{
    Plan, SearchCriteria, Status, Subscription, SubscriptionAction, User,
    UserStore, format_relative,
};
pub use update_subscription::{
    UpdateSubscriptionParameters, UpdateSubscriptionTool,
};
