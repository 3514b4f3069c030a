pub(crate) mod seedbox;
pub(crate) mod sessions;
pub(crate) mod status;
pub(crate) mod watch;
