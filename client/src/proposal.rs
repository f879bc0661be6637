// Copyright (c) 2024 The Weft Authors

//! Proposal construction and signing.

use crate::{Error, Result};
use prost::Message;
use std::collections::HashMap;
use weft_identity::IdentityContext;
use weft_protocol::{
    common::{ChannelHeader, Header, HeaderType, SignatureHeader},
    peer::{
        chaincode_spec, ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput,
        ChaincodeInvocationSpec, ChaincodeProposalPayload, ChaincodeSpec, Proposal,
        SignedProposal,
    },
};

/// A built and signed proposal, retaining the exact signed bytes and
/// the pieces the transaction envelope reuses later.
///
/// The signature covers `proposal_bytes` verbatim; the same proposal is
/// never re-signed under a different nonce.
#[derive(Clone, Debug)]
pub struct SignedProposalBundle {
    pub tx_id: String,
    pub channel_id: String,
    /// The serialized proposal — the byte string that was signed.
    pub proposal_bytes: Vec<u8>,
    pub signature: Vec<u8>,
    /// The proposal's header, reused verbatim in the transaction
    /// envelope.
    pub header: Header,
    /// The chaincode proposal payload with the transient map stripped,
    /// as it appears inside the ordered transaction.
    pub payload_no_transient: Vec<u8>,
}

impl SignedProposalBundle {
    /// The wire form dispatched to endorsers.
    pub fn signed_proposal(&self) -> SignedProposal {
        SignedProposal {
            proposal_bytes: self.proposal_bytes.clone(),
            signature: self.signature.clone(),
        }
    }
}

/// Build and sign a chaincode invocation proposal.
///
/// The invocation is `function(args...)`; `transient` is passed to the
/// chaincode but never becomes part of the ordered transaction.
pub fn build_proposal(
    ctx: &IdentityContext,
    channel_id: &str,
    chaincode_name: &str,
    function: &str,
    args: &[&[u8]],
    transient: HashMap<String, Vec<u8>>,
) -> Result<SignedProposalBundle> {
    if channel_id.is_empty() {
        return Err(Error::BadArgs("channel id must not be empty".into()));
    }
    if chaincode_name.is_empty() {
        return Err(Error::BadArgs("chaincode name must not be empty".into()));
    }
    if function.is_empty() {
        return Err(Error::BadArgs("function name must not be empty".into()));
    }

    let chaincode_id = ChaincodeId {
        path: String::new(),
        name: chaincode_name.to_owned(),
        version: String::new(),
    };

    let channel_header = ChannelHeader {
        r#type: HeaderType::EndorserTransaction as i32,
        version: 0,
        timestamp: Some(std::time::SystemTime::now().into()),
        channel_id: channel_id.to_owned(),
        tx_id: ctx.tx_id().to_owned(),
        epoch: 0,
        extension: ChaincodeHeaderExtension { chaincode_id: Some(chaincode_id.clone()) }
            .encode_to_vec(),
        tls_cert_hash: Vec::new(),
    };
    let signature_header = SignatureHeader {
        creator: ctx.creator(),
        nonce: ctx.nonce().to_vec(),
    };
    let header = Header {
        channel_header: channel_header.encode_to_vec(),
        signature_header: signature_header.encode_to_vec(),
    };

    // First argument is the function name, the rest its arguments.
    let mut invocation_args = Vec::with_capacity(args.len() + 1);
    invocation_args.push(function.as_bytes().to_vec());
    invocation_args.extend(args.iter().map(|arg| arg.to_vec()));

    let invocation = ChaincodeInvocationSpec {
        chaincode_spec: Some(ChaincodeSpec {
            r#type: chaincode_spec::Type::Golang as i32,
            chaincode_id: Some(chaincode_id),
            input: Some(ChaincodeInput {
                args: invocation_args,
                decorations: Default::default(),
                is_init: false,
            }),
            timeout: 0,
        }),
    };

    let payload = ChaincodeProposalPayload {
        input: invocation.encode_to_vec(),
        transient_map: transient,
    };
    let payload_no_transient = ChaincodeProposalPayload {
        input: payload.input.clone(),
        transient_map: Default::default(),
    }
    .encode_to_vec();

    let proposal = Proposal {
        header: header.encode_to_vec(),
        payload: payload.encode_to_vec(),
        extension: Vec::new(),
    };
    let proposal_bytes = proposal.encode_to_vec();
    let signature = ctx.sign(&proposal_bytes)?;

    Ok(SignedProposalBundle {
        tx_id: ctx.tx_id().to_owned(),
        channel_id: channel_id.to_owned(),
        proposal_bytes,
        signature,
        header,
        payload_no_transient,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};
    use weft_crypto::{self_signed, KeyAlgorithm, KeyPair};
    use weft_identity::Identity;

    fn context() -> IdentityContext {
        let key = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
        let cert = self_signed(&key, "CN=app,O=org1", Duration::from_secs(3600)).unwrap();
        IdentityContext::new(Arc::new(Identity::new("Org1MSP", cert.to_pem(), key).unwrap()))
    }

    #[test]
    fn signature_covers_the_exact_proposal_bytes() {
        let ctx = context();
        let bundle =
            build_proposal(&ctx, "trade", "asset", "put", &[b"k", b"v"], Default::default())
                .unwrap();

        assert!(ctx
            .identity()
            .public_key()
            .verify(&bundle.proposal_bytes, &bundle.signature)
            .unwrap());
    }

    #[test]
    fn header_carries_tx_id_and_nonce_from_the_context() {
        let ctx = context();
        let bundle =
            build_proposal(&ctx, "trade", "asset", "put", &[b"k"], Default::default()).unwrap();

        let channel_header =
            ChannelHeader::decode(bundle.header.channel_header.as_slice()).unwrap();
        assert_eq!(channel_header.tx_id, ctx.tx_id());
        assert_eq!(channel_header.channel_id, "trade");
        assert_eq!(channel_header.r#type, HeaderType::EndorserTransaction as i32);
        assert_eq!(channel_header.epoch, 0);

        let signature_header =
            SignatureHeader::decode(bundle.header.signature_header.as_slice()).unwrap();
        assert_eq!(signature_header.nonce, ctx.nonce());
        assert_eq!(signature_header.creator, ctx.creator());
    }

    #[test]
    fn function_is_the_first_invocation_argument() {
        let ctx = context();
        let bundle =
            build_proposal(&ctx, "trade", "asset", "put", &[b"k", b"v"], Default::default())
                .unwrap();

        let proposal = Proposal::decode(bundle.proposal_bytes.as_slice()).unwrap();
        let payload = ChaincodeProposalPayload::decode(proposal.payload.as_slice()).unwrap();
        let invocation = ChaincodeInvocationSpec::decode(payload.input.as_slice()).unwrap();
        let args = invocation.chaincode_spec.unwrap().input.unwrap().args;
        assert_eq!(args, vec![b"put".to_vec(), b"k".to_vec(), b"v".to_vec()]);
    }

    #[test]
    fn transient_data_is_stripped_from_the_ordered_payload() {
        let ctx = context();
        let mut transient = HashMap::new();
        transient.insert("secret".to_owned(), b"s3cr3t".to_vec());
        let bundle = build_proposal(&ctx, "trade", "asset", "put", &[], transient).unwrap();

        let proposal = Proposal::decode(bundle.proposal_bytes.as_slice()).unwrap();
        let sent = ChaincodeProposalPayload::decode(proposal.payload.as_slice()).unwrap();
        assert!(sent.transient_map.contains_key("secret"));

        let ordered =
            ChaincodeProposalPayload::decode(bundle.payload_no_transient.as_slice()).unwrap();
        assert!(ordered.transient_map.is_empty());
        assert_eq!(ordered.input, sent.input);
    }

    #[test]
    fn missing_required_fields_are_bad_args() {
        let ctx = context();
        assert_matches::assert_matches!(
            build_proposal(&ctx, "", "asset", "put", &[], Default::default()),
            Err(Error::BadArgs(_))
        );
        assert_matches::assert_matches!(
            build_proposal(&ctx, "trade", "", "put", &[], Default::default()),
            Err(Error::BadArgs(_))
        );
        assert_matches::assert_matches!(
            build_proposal(&ctx, "trade", "asset", "", &[], Default::default()),
            Err(Error::BadArgs(_))
        );
    }
}
