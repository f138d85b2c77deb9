//! Built-in list of tracked high-balance addresses, largest first.

use crate::ledger::{EntityTag, TagKind};

type Row = (&'static str, Option<(&'static str, TagKind)>);

const TRACKED: [Row; 36] = [
    ("kaspa:qpz2vgvlxhmyhmt22h538pjzmvvd52nuut80y5zulgpvyerlskvvwm7n4uk5a", Some(("Entity X", TagKind::Whale))),
    ("kaspa:qpzpfwcsqsxhxwup26r55fd0ghqlhyugz8cp6y3wxuddc02vcxtjg75pspnwz", Some(("MEXC", TagKind::Exchange))),
    ("kaspa:qrelgny7sr3vahq69yykxx36m65gvmhryxrlwngfzgu8xkdslum2yxjp3ap8m", Some(("Gate.io", TagKind::Exchange))),
    ("kaspa:qrvum29vk365g0zcd5gx3c7h829etfq2ytdmscjzw4zw04fjfnprcg9c3tges", Some(("Bybit", TagKind::Exchange))),
    ("kaspa:qzadxjufntvckxrvy76pyhvtkuu8lg5ryz252aglmhlyv27pxqplksshzuu9m", Some(("KuCoin", TagKind::Exchange))),
    ("kaspa:qzxrs8gxjgk2q84wlt3xfd057ntws73fptalhy84g85zqfu5lcemvpu04vj3w", Some(("Uphold", TagKind::Exchange))),
    ("kaspa:qpj2x2qfmvj4g6fn0xadv6hafdaqv4fwd3t4uvyw3walwfn50rzysa4lafpma", Some(("Kraken", TagKind::Exchange))),
    ("kaspa:qq2ka745yyj0760fkt3ax3t7hpyqret6pzaypag3afnd3fp8jpv4cmzpx8yrt", None),
    ("kaspa:qqfxn597v5c23td4asz99ky52sha8l2ypq8kmrsqxcu7skhdunncjgup0hdys", None),
    ("kaspa:qzpt2wp67seprjndmrzu58g4sgkknxp0y5g97y5leupj7ugffqhs6xgxdjwtf", None),
    ("kaspa:qr8k05f9n6xtrd0eex5lr6878mc5n7dgrtn8xv3frfvuxgfchx9077jtz5tsk", None),
    ("kaspa:qpap72xed702y4ahw537l3x63788nrh3ea5a0y06we236d5rth43wptqsv0ws", None),
    ("kaspa:qz06rpdaap56ktn3xf3w70g09s9dphrkmnks027lnshyqd6x5l8tzt8lcpp4k", None),
    ("kaspa:qqywx2wszmnrsu0mzgav85rdwvzangfpdj9j3ady9jpr7hu4u8c2wl9wqgd6j", Some(("Bitget", TagKind::Exchange))),
    ("kaspa:ppwn9mz7ht2p8w8mqtafvuw0sslqff7svk0e5j5vterutxwd3gmygnqdrppm5", None),
    ("kaspa:qr9fqcxp9xjprsm9sv7apy6qc0ja2p676m9gf9fkcww2qmaw4npxzllh7lrw0", Some(("Kraken", TagKind::Exchange))),
    ("kaspa:qq2hke25nvxsnnawzlym3nf6y38clrhdefph5xckeuyyzxwh99kavfu77grmg", None),
    ("kaspa:qpky2f87j7my5ph5taucutm74tfssz8l97m770rqdtnmzmece7r9gf3l2hpze", None),
    ("kaspa:qq6kjumc6l95hq005yz2gazrqev3pyfjvqefxef93wz6u2makfhmsrct65f6", None),
    ("kaspa:qr6pqdkru9fgwlm8yyqzp7cww9vj7auuq5vratzy4ev3luzj79t5ycvp8euuf", Some(("Kraken", TagKind::Exchange))),
    ("kaspa:qrtxzw8j3ydwna6spm7etj7x36dzj06h7q84hxn6ueapphfg8txazcycmnalc", None),
    ("kaspa:qzew5mu908h4gfw7qgvpux7hlkfqrjz06zazag8nmrykjz59479uqlm8n9q9q", None),
    ("kaspa:qqn98feqplp4nc92wgq7j7cy6cdnaugnzngeatps7swaxkw0s9e0c7rjjdrxf", None),
    ("kaspa:qp2sp0vvrwu4s8pw0j68muu2ta5qar5mehf8ehuvljw5zsrakk5cvx4gvqz7z", None),
    ("kaspa:qpu0zrz92y5m4s0vf8ml0tqrhc85l943t9efghexqd4rt09cfynjzw5rmfdws", None),
    ("kaspa:ppk66xua7nmq8elv3eglfet0xxcfuks835xdgsm5jlymjhazyu6h5ac62l4ey", Some(("DAGKnight Fund", TagKind::Dev))),
    ("kaspa:qzganetmrpwv88ea0pkma0xvgacw034l6jv9e9kvh0mup47ahqpc24la7yfmf", None),
    ("kaspa:pqtm55d2a456qws90g096cxnecc7msjmxr8n2ernwues8zfdamkl2kfmxr8gr", Some(("Rust Fund", TagKind::Dev))),
    ("kaspa:qrepacgj2flpflt8f7luh3ru4sykgt8d5k7s0sh4zlflk3glqpwjvq9kx7smk", None),
    ("kaspa:qpxg04pk29q9pf6uzakcxugdl3td6xkx875p24wkr3hjjgkh9gsp2p5m3akay", None),
    ("kaspa:qrjjnrk9vd9je8wnlqq9dz7fhmhurgjjed8n2pnzh5jwgjmef5pvzd4vf0lu7", None),
    ("kaspa:qypnwqfqltw6p8j8x7hj3w962l8a4ha5admykfs7z30fc07vydftmng942wwmmw", None),
    ("kaspa:qpkf9c9t2vhu7dt037rkmutyjcgg29hlwq25xnxgln6x5uq6ajtnucslxlk9a", None),
    ("kaspa:qyppcdqxpu3sw49k6xcj8wcqjd98lpvpc8cm30wfnj003ahlhjzkh0s67gjxuv", None),
    ("kaspa:qyp3ffdjvv6de6cg6jjgyhlg3mt3fngna2vzukdpzvwkaj5j3hctsyqecqf7dh3", Some(("MARA", TagKind::Mining))),
    ("kaspa:qr7vrlhgekw9efxgfq09ca3wqcxlslgxndcpk77pguu2usaa9aa27lhuunewj", Some(("Uphold", TagKind::Exchange))),
];

#[derive(Debug, Clone, PartialEq)]
pub struct WatchEntry {
    pub address: String,
    pub tag: Option<EntityTag>,
}

impl WatchEntry {
    pub fn new(address: impl Into<String>, tag: Option<EntityTag>) -> Self {
        Self { address: address.into(), tag }
    }
}

pub fn default_watchlist() -> Vec<WatchEntry> {
    TRACKED
        .iter()
        .map(|&(address, tag)| {
            WatchEntry::new(
                address,
                tag.map(|(name, kind)| EntityTag { name: name.to_string(), kind }),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_watchlist_unique_and_well_formed() {
        let list = default_watchlist();
        assert_eq!(list.len(), 36);
        let unique: HashSet<&str> = list.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(unique.len(), list.len());
        assert!(list.iter().all(|e| e.address.starts_with("kaspa:")));
    }

    #[test]
    fn test_tags_carried() {
        let list = default_watchlist();
        let tag = list[1].tag.as_ref().unwrap();
        assert_eq!(tag.name, "MEXC");
        assert_eq!(tag.kind, TagKind::Exchange);
        assert!(list[7].tag.is_none());
    }
}
