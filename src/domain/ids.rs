use rand::distributions::Alphanumeric;
use rand::Rng;

const BILL_ID_LEN: usize = 20;
const USER_ID_LEN: usize = 6;

pub fn generate_bill_id() -> String {
  generate_id(BILL_ID_LEN)
}

/// Short upper-case id shown to the owner in settings.
pub fn generate_user_id() -> String {
  generate_id(USER_ID_LEN).to_ascii_uppercase()
}

fn generate_id(len: usize) -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(len)
    .map(char::from)
    .collect()
}
