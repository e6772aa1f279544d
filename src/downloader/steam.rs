// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use steam_vent::{Connection, ConnectionTrait, ServerList};
use steam_vent_proto_steam::{
    steammessages_clientserver_ufs::{
        CMsgClientUFSGetUGCDetails, CMsgClientUFSGetUGCDetailsResponse,
    },
    steammessages_publishedfile_steamclient::{
        CPublishedFile_GetDetails_Request, CPublishedFile_GetDetails_Response,
    },
};
use tracing::info;

use crate::addon::AddonId;
use crate::downloader::traits::WorkshopSource;

#[derive(thiserror::Error, Debug)]
pub enum SteamError {
    #[error("Failed to discover Steam servers: {0}")]
    ServerDiscovery(#[from] steam_vent::ServerDiscoveryError),

    #[error("Failed to connect to Steam: {0}")]
    Connection(#[from] steam_vent::ConnectionError),

    #[error("Network error: {0}")]
    Network(#[from] steam_vent::NetworkError),

    #[error("Workshop item not found: {0}")]
    WorkshopIdNotFound(AddonId),

    #[error("Failed to get download URL: eresult={0}")]
    DownloadUrlFailed(i32),

    #[error("No download URL available for workshop item")]
    NoDownloadUrl,
}

/// Anonymous Steam connection used to locate workshop content
pub struct SteamConnection {
    connection: Connection,
    app_id: u32,
}

impl SteamConnection {
    /// Create a new Steam connection using anonymous authentication
    pub async fn new(app_id: u32) -> Result<Self, SteamError> {
        info!("Discovering Steam servers");
        let server_list = ServerList::discover().await?;

        info!("Establishing anonymous Steam connection");
        let connection = Connection::anonymous(&server_list).await?;

        Ok(Self { connection, app_id })
    }

    /// Get the UGC content handle of a workshop item
    pub async fn get_hcontent(&self, id: AddonId) -> Result<u64, SteamError> {
        info!(addon = %id, "Fetching workshop file details");

        let mut req = CPublishedFile_GetDetails_Request::new();
        req.publishedfileids = vec![id.get()];
        req.appid = Some(self.app_id);

        let response: CPublishedFile_GetDetails_Response = self
            .connection
            .service_method(req)
            .await
            .map_err(SteamError::Network)?;

        let Some(details) = response.publishedfiledetails.first() else {
            return Err(SteamError::WorkshopIdNotFound(id));
        };

        let hcontent = details.hcontent_file();
        if hcontent == 0 {
            return Err(SteamError::WorkshopIdNotFound(id));
        }

        info!(addon = %id, hcontent, "Got content handle for workshop item");
        Ok(hcontent)
    }

    /// Get download URL from hcontent handle
    pub async fn get_download_url(&self, hcontent: u64) -> Result<String, SteamError> {
        info!(hcontent, "Getting download URL from hcontent");

        let mut req = CMsgClientUFSGetUGCDetails::new();
        req.set_hcontent(hcontent);

        let response: CMsgClientUFSGetUGCDetailsResponse = self
            .connection
            .job::<CMsgClientUFSGetUGCDetails, CMsgClientUFSGetUGCDetailsResponse>(req)
            .await
            .map_err(SteamError::Network)?;

        let eresult = response.eresult();
        if eresult != 1 {
            return Err(SteamError::DownloadUrlFailed(eresult));
        }

        if !response.has_url() || response.url().is_empty() {
            return Err(SteamError::NoDownloadUrl);
        }

        Ok(response.url().to_string())
    }
}

#[async_trait]
impl WorkshopSource for SteamConnection {
    async fn resolve_download_url(&self, id: AddonId) -> anyhow::Result<String> {
        let hcontent = self.get_hcontent(id).await?;
        let url = self.get_download_url(hcontent).await?;
        info!(addon = %id, url = %url, "Resolved workshop download URL");
        Ok(url)
    }
}
