use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BusinessRules {
    /// Trips departing further out than this are `Created`, closer ones `Upcoming`
    #[serde(default = "default_upcoming_window_days")]
    pub upcoming_window_days: u32,
    /// Synthetic trip length used for one-way trips in status and conflict checks
    #[serde(default = "default_one_way_window_hours")]
    pub one_way_window_hours: u32,
    #[serde(default = "default_seat_token_max_len")]
    pub seat_token_max_len: usize,
    /// Decimal places kept for displayed amounts
    #[serde(default = "default_payment_scale")]
    pub payment_scale: u32,
}

fn default_upcoming_window_days() -> u32 { 30 }
fn default_one_way_window_hours() -> u32 { 24 }
fn default_seat_token_max_len() -> usize { 3 }
fn default_payment_scale() -> u32 { 2 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            upcoming_window_days: default_upcoming_window_days(),
            one_way_window_hours: default_one_way_window_hours(),
            seat_token_max_len: default_seat_token_max_len(),
            payment_scale: default_payment_scale(),
        }
    }
}
