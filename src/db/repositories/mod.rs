mod documents;
mod highlights;
mod sessions;
