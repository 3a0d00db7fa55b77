use datahub_auth::UserPrincipal;

/// Identity resolved for the current request.
///
/// Inserted by the identity middleware on every request it sees; `None` means
/// the request is anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser(Option<UserPrincipal>);

impl CurrentUser {
    pub fn new(principal: Option<UserPrincipal>) -> Self {
        Self(principal)
    }

    pub fn principal(&self) -> Option<&UserPrincipal> {
        self.0.as_ref()
    }
}
