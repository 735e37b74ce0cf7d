//! Comic state kept per browser session.

use super::prelude::*;

pub(crate) const COMIC_KEY: &str = "comic";
const INPUT_KEY: &str = "manga_input";

/// The session's canonical comic plus what the export needs to go with it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct SessionComic {
    pub(crate) comic: Comic,
    pub(crate) product_name: String,
    pub(crate) product_description: String,
}

pub(crate) async fn load_comic(session: &Session) -> Result<Option<SessionComic>, MangaError> {
    Ok(session.get::<SessionComic>(COMIC_KEY).await?)
}

pub(crate) async fn store_comic(session: &Session, saved: &SessionComic) -> Result<(), MangaError> {
    session.insert(COMIC_KEY, saved).await?;
    Ok(())
}

/// The last submitted brief, so the form comes back filled in.
pub(crate) async fn last_input(session: &Session) -> Result<MangaInput, MangaError> {
    Ok(session
        .get::<MangaInput>(INPUT_KEY)
        .await?
        .unwrap_or_default())
}

pub(crate) async fn store_input(session: &Session, input: &MangaInput) -> Result<(), MangaError> {
    session.insert(INPUT_KEY, input).await?;
    Ok(())
}
